//! Local storage backend for sosreport.
//!
//! Reports live in a `SQLite` database and media files in a directory tree,
//! so the whole flow runs without a cloud project.

mod blobs;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::backend::DocumentStore;
use crate::error::{Error, Result};
use crate::report::{format_timestamp, DistressType, Location, Report};

pub use blobs::DirectoryBlobStore;

const SELECT_COLUMNS: &str = r"
    SELECT id, call_time, latitude, longitude, caller_name, caller_number,
           distress_type, message, voice_note, images
    FROM reports
";

/// `SQLite`-backed report store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a report database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a report, returning its new identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, collection: &str, report: &Report) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let images = serde_json::to_string(&report.images)?;

        self.conn().execute(
            r"
            INSERT INTO reports (id, collection, call_time, latitude, longitude,
                                 caller_name, caller_number, distress_type, message,
                                 voice_note, images)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                id,
                collection,
                format_timestamp(report.call_time),
                report.location.latitude,
                report.location.longitude,
                report.caller_name,
                report.caller_number,
                report.distress_type.to_string(),
                report.message,
                report.voice_note,
                images,
            ],
        )?;

        debug!("Inserted report {} into {}", id, collection);
        Ok(id)
    }

    /// Get a report by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &str) -> Result<Option<Report>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let report = self
            .conn()
            .query_row(&sql, [id], Self::row_to_report)
            .optional()?;
        Ok(report)
    }

    /// All reports in `collection`, newest call time first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn newest_first(&self, collection: &str) -> Result<Vec<Report>> {
        let sql = format!("{SELECT_COLUMNS} WHERE collection = ?1 ORDER BY call_time DESC");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let reports = stmt
            .query_map([collection], Self::row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Count reports in `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, collection: &str) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM reports WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Convert a database row to a Report.
    fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<Report> {
        let id: String = row.get(0)?;
        let call_time: String = row.get(1)?;
        let distress_type: String = row.get(6)?;
        let images: String = row.get(9)?;

        let call_time = chrono::DateTime::parse_from_rfc3339(&call_time)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?;

        let distress_type: DistressType =
            serde_json::from_value(serde_json::Value::String(distress_type))
                .unwrap_or(DistressType::Other);

        let images = serde_json::from_str(&images).unwrap_or_else(|e| {
            warn!("Unreadable image list on report {}: {}", id, e);
            Vec::new()
        });

        Ok(Report {
            id: Some(id),
            call_time,
            location: Location::new(row.get(2)?, row.get(3)?),
            caller_name: row.get(4)?,
            caller_number: row.get(5)?,
            distress_type,
            message: row.get(7)?,
            voice_note: row.get(8)?,
            images,
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for Storage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, collection: &str, report: &Report) -> Result<String> {
        self.insert(collection, report)
            .map_err(|e| Error::write(collection, e.to_string()))
    }

    async fn list_newest_first(&self, collection: &str) -> Result<Vec<Report>> {
        self.newest_first(collection)
            .map_err(|e| Error::read(collection, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn create_test_report(hour: u32, caller: &str) -> Report {
        Report {
            id: None,
            call_time: Utc.with_ymd_and_hms(2023, 5, 26, hour, 0, 0).unwrap(),
            location: Location::new(50.0, -0.5),
            caller_name: caller.to_string(),
            caller_number: "1234567890".to_string(),
            distress_type: DistressType::Security,
            message: "This is an SOS, please help".to_string(),
            voice_note: Some("file:///tmp/a.wav".to_string()),
            images: vec![Some("file:///tmp/a.png".to_string()), None],
        }
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let report = create_test_report(12, "John Doe");

        let id = storage.insert("sosMessages", &report).unwrap();
        let fetched = storage.get(&id).unwrap().unwrap();

        assert_eq!(fetched.id.as_deref(), Some(id.as_str()));
        assert_eq!(fetched.clone().with_id(""), report.with_id(""));
    }

    #[test]
    fn test_get_missing() {
        let storage = create_test_storage();
        assert!(storage.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_identical_reports_are_distinct_rows() {
        let storage = create_test_storage();
        let report = create_test_report(12, "Same");

        let a = storage.insert("sosMessages", &report).unwrap();
        let b = storage.insert("sosMessages", &report).unwrap();

        assert_ne!(a, b);
        assert_eq!(storage.count("sosMessages").unwrap(), 2);
    }

    #[test]
    fn test_newest_first() {
        let storage = create_test_storage();
        storage.insert("sosMessages", &create_test_report(9, "nine")).unwrap();
        storage.insert("sosMessages", &create_test_report(14, "fourteen")).unwrap();
        storage.insert("sosMessages", &create_test_report(11, "eleven")).unwrap();
        storage.insert("other", &create_test_report(23, "elsewhere")).unwrap();

        let names: Vec<_> = storage
            .newest_first("sosMessages")
            .unwrap()
            .into_iter()
            .map(|r| r.caller_name)
            .collect();
        assert_eq!(names, ["fourteen", "eleven", "nine"]);
    }

    #[test]
    fn test_null_image_slots_survive() {
        let storage = create_test_storage();
        let id = storage
            .insert("sosMessages", &create_test_report(1, "x"))
            .unwrap();

        let fetched = storage.get(&id).unwrap().unwrap();
        assert_eq!(fetched.images.len(), 2);
        assert!(fetched.images[1].is_none());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/reports.db");

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_keeps_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.insert("sosMessages", &create_test_report(3, "kept")).unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.count("sosMessages").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_document_store_impl() {
        let storage = create_test_storage();
        let id = storage
            .create("sosMessages", &create_test_report(5, "async"))
            .await
            .unwrap();

        let listed = storage.list_newest_first("sosMessages").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.as_deref(), Some(id.as_str()));
    }
}
