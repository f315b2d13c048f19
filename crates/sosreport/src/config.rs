//! Configuration management for sosreport.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::report::Location;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "sosreport";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "reports.db";

/// Directory under the data dir holding local blobs.
const BLOB_DIR_NAME: &str = "blobs";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SOSREPORT_`, `__` between levels)
/// 2. TOML config file at `~/.config/sosreport/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend selection and credentials.
    pub backend: BackendConfig,
    /// Report contents.
    pub report: ReportConfig,
    /// Voice recording.
    pub recording: RecordingConfig,
    /// Fixed device position.
    pub geolocation: GeolocationConfig,
}

/// Which backend stores reports and media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// SQLite database and files under the data directory.
    #[default]
    Local,
    /// Cloud Firestore and Firebase Storage.
    Firebase,
    /// In-process only; nothing outlives the command.
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Firebase => write!(f, "firebase"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Backend-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend to use.
    pub kind: BackendKind,
    /// Data directory for the local backend.
    /// Defaults to `~/.local/share/sosreport`
    pub data_dir: Option<PathBuf>,
    /// Firebase project settings.
    pub firebase: FirebaseConfig,
}

/// Firebase project settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    /// Project identifier.
    pub project_id: String,
    /// Web API key.
    pub api_key: String,
    /// Storage bucket, e.g. `my-app.appspot.com`.
    pub storage_bucket: String,
    /// Firestore database name.
    pub database: String,
    /// Firestore REST base URL.
    pub firestore_endpoint: String,
    /// Firebase Storage REST base URL.
    pub storage_endpoint: String,
}

/// Report-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Document collection holding reports.
    pub collection: String,
    /// Message stored with every report.
    pub message: String,
}

/// Recording-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Maximum recording length in seconds.
    pub countdown_secs: u64,
    /// Bytes per chunk when streaming an audio file.
    pub chunk_size: usize,
    /// Playback rate of audio files without a WAV header.
    pub bytes_per_sec: u64,
}

/// A fixed device position, used when none is given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: String::new(),
            storage_bucket: String::new(),
            database: "(default)".to_string(),
            firestore_endpoint: "https://firestore.googleapis.com/v1".to_string(),
            storage_endpoint: "https://firebasestorage.googleapis.com/v0".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            collection: "sosMessages".to_string(),
            message: "This is an SOS, please help".to_string(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 30,
            chunk_size: 4096,
            bytes_per_sec: 32_000,
        }
    }
}

impl GeolocationConfig {
    /// The configured position, if both coordinates are set.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location::new(latitude, longitude)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SOSREPORT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.recording.countdown_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "countdown_secs must be greater than 0".to_string(),
            });
        }

        if self.recording.chunk_size == 0 {
            return Err(Error::ConfigValidation {
                message: "chunk_size must be greater than 0".to_string(),
            });
        }

        if self.recording.bytes_per_sec == 0 {
            return Err(Error::ConfigValidation {
                message: "bytes_per_sec must be greater than 0".to_string(),
            });
        }

        if self.report.collection.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "collection must not be empty".to_string(),
            });
        }

        if self.backend.kind == BackendKind::Firebase {
            let firebase = &self.backend.firebase;
            if firebase.project_id.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "firebase backend requires project_id".to_string(),
                });
            }
            if firebase.storage_bucket.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "firebase backend requires storage_bucket".to_string(),
                });
            }
        }

        match (self.geolocation.latitude, self.geolocation.longitude) {
            (None, None) => {}
            (Some(latitude), Some(longitude)) => {
                if !Location::new(latitude, longitude).is_valid() {
                    return Err(Error::ConfigValidation {
                        message: format!(
                            "coordinates out of range: latitude {latitude}, longitude {longitude}"
                        ),
                    });
                }
            }
            _ => {
                return Err(Error::ConfigValidation {
                    message: "latitude and longitude must be set together".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.backend
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Path of the local report database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE_NAME)
    }

    /// Root directory of the local blob store.
    #[must_use]
    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir().join(BLOB_DIR_NAME)
    }

    /// Get the recording countdown as a Duration.
    #[must_use]
    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.recording.countdown_secs)
    }
}
