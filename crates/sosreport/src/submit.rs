//! Report submission.
//!
//! [`Submitter::submit`] runs the whole send sequence: stamp the call time,
//! locate the device, read the form, upload images, then write one
//! document. A location failure stops everything before any upload; a
//! write failure is surfaced once and never retried.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::backend::{BlobStore, DocumentStore};
use crate::config::ReportConfig;
use crate::error::Result;
use crate::form::ReportForm;
use crate::geolocation::Geolocator;
use crate::media::upload_images;
use crate::recorder::VoiceNoteSource;
use crate::report::Report;
use crate::ui::Notifier;

/// Notification shown after a successful write.
pub const SUCCESS_MESSAGE: &str = "SOS sent successfully";

/// A report that was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Identifier assigned by the document store.
    pub id: String,
    /// The document as written, tagged with `id`.
    pub report: Report,
}

/// Wires the form, the device and the backends into one send action.
#[derive(Clone)]
pub struct Submitter {
    form: Arc<dyn ReportForm>,
    geolocator: Arc<dyn Geolocator>,
    voice_note: Arc<dyn VoiceNoteSource>,
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    settings: ReportConfig,
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("blobs", &self.blobs.name())
            .field("documents", &self.documents.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Submitter {
    /// Create a submitter over the given collaborators.
    #[must_use]
    pub fn new(
        form: Arc<dyn ReportForm>,
        geolocator: Arc<dyn Geolocator>,
        voice_note: Arc<dyn VoiceNoteSource>,
        blobs: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            form,
            geolocator,
            voice_note,
            blobs,
            documents,
            notifier,
            settings: ReportConfig::default(),
        }
    }

    /// Use a different collection and message.
    #[must_use]
    pub fn with_settings(mut self, settings: ReportConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Send one report.
    ///
    /// # Errors
    ///
    /// Returns the location error if the device cannot be located (nothing
    /// is uploaded or written), or the store's error if the write fails.
    /// Both are also reported through the notifier.
    pub async fn submit(&self) -> Result<Submission> {
        let call_time = Utc::now();

        let location = match self.geolocator.current_position().await {
            Ok(location) => location,
            Err(err) => {
                warn!("Location unavailable, report not sent: {}", err);
                self.notifier.alert(&format!(
                    "Unable to retrieve location: {}",
                    err.user_message()
                ));
                return Err(err);
            }
        };
        debug!(
            "Located at {}, {}",
            location.latitude, location.longitude
        );

        let files = self.form.image_files();
        let images = upload_images(self.blobs.as_ref(), &files, self.notifier.as_ref()).await;

        let report = Report {
            id: None,
            call_time,
            location,
            caller_name: self.form.caller_name(),
            caller_number: self.form.caller_number(),
            distress_type: self.form.distress_type(),
            message: self.settings.message.clone(),
            voice_note: self.voice_note.voice_note_url(),
            images,
        };

        match self.documents.create(&self.settings.collection, &report).await {
            Ok(id) => {
                info!(
                    "Report {} written to {} ({} images, {} failed)",
                    id,
                    self.settings.collection,
                    report.images.len(),
                    report.missing_images()
                );
                self.notifier.alert(SUCCESS_MESSAGE);
                Ok(Submission {
                    report: report.with_id(id.clone()),
                    id,
                })
            }
            Err(err) => {
                error!("Failed to write report: {}", err);
                self.notifier.alert(&format!(
                    "An error occurred sending your message: {}",
                    err.user_message()
                ));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBlobStore, MemoryDocumentStore};
    use crate::error::Error;
    use crate::form::{FormInput, MediaFile};
    use crate::geolocation::FixedGeolocator;
    use crate::recorder::NoVoiceNote;
    use crate::report::{DistressType, Location};
    use crate::testing::{FailingGeolocator, RecordingNotifier};

    struct FixedVoiceNote(&'static str);

    impl VoiceNoteSource for FixedVoiceNote {
        fn voice_note_url(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct Harness {
        blobs: Arc<MemoryBlobStore>,
        documents: Arc<MemoryDocumentStore>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new(blobs: MemoryBlobStore, documents: MemoryDocumentStore) -> Self {
            Self {
                blobs: Arc::new(blobs),
                documents: Arc::new(documents),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn submitter(
            &self,
            form: FormInput,
            geolocator: Arc<dyn Geolocator>,
            voice_note: Arc<dyn VoiceNoteSource>,
        ) -> Submitter {
            Submitter::new(
                Arc::new(form),
                geolocator,
                voice_note,
                self.blobs.clone(),
                self.documents.clone(),
                self.notifier.clone(),
            )
        }
    }

    fn john_doe(images: Vec<MediaFile>) -> FormInput {
        FormInput {
            caller_name: "John Doe".to_string(),
            caller_number: "1234567890".to_string(),
            distress_type: DistressType::Medical,
            images,
        }
    }

    fn located() -> Arc<dyn Geolocator> {
        Arc::new(FixedGeolocator::at(Location::new(50.0, 50.0)))
    }

    #[tokio::test]
    async fn test_submit_writes_one_document() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h.submitter(
            john_doe(vec![MediaFile::new("scene.png", "image/png", vec![1, 2])]),
            located(),
            Arc::new(FixedVoiceNote("memory://recordings/a.wav")),
        );

        let submission = submitter.submit().await.unwrap();

        let stored = h.documents.reports("sosMessages");
        assert_eq!(stored.len(), 1);
        let report = &stored[0];
        assert_eq!(report.caller_name, "John Doe");
        assert_eq!(report.caller_number, "1234567890");
        assert_eq!(report.distress_type, DistressType::Medical);
        assert_eq!(report.location, Location::new(50.0, 50.0));
        assert_eq!(report.message, "This is an SOS, please help");
        assert_eq!(
            report.voice_note.as_deref(),
            Some("memory://recordings/a.wav")
        );
        assert_eq!(report.images.len(), 1);
        assert!(report.images[0]
            .as_deref()
            .unwrap()
            .ends_with("-scene.png"));

        assert_eq!(submission.report.id.as_deref(), Some(submission.id.as_str()));
        assert_eq!(h.notifier.messages(), [SUCCESS_MESSAGE]);
    }

    #[tokio::test]
    async fn test_location_denied_writes_nothing() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h.submitter(
            john_doe(vec![MediaFile::new("scene.png", "image/png", vec![1])]),
            Arc::new(FailingGeolocator::Denied),
            Arc::new(NoVoiceNote),
        );

        let err = submitter.submit().await.unwrap_err();

        assert!(err.is_location_error());
        assert_eq!(h.documents.write_attempts(), 0);
        assert!(h.blobs.keys().is_empty());
        assert!(h
            .documents
            .list_newest_first("sosMessages")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            h.notifier.messages(),
            ["Unable to retrieve location: geolocation permission denied: User denied Geolocation"]
        );
    }

    #[tokio::test]
    async fn test_location_timeout_aborts() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h.submitter(
            john_doe(Vec::new()),
            Arc::new(FailingGeolocator::TimedOut),
            Arc::new(NoVoiceNote),
        );

        assert!(matches!(
            submitter.submit().await,
            Err(Error::LocationTimeout)
        ));
        assert_eq!(h.documents.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_once() {
        let h = Harness::new(
            MemoryBlobStore::new(),
            MemoryDocumentStore::new().failing_writes("Firebase error"),
        );
        let submitter = h.submitter(john_doe(Vec::new()), located(), Arc::new(NoVoiceNote));

        let err = submitter.submit().await.unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(h.documents.write_attempts(), 1);
        assert_eq!(
            h.notifier.messages(),
            ["An error occurred sending your message: Firebase error"]
        );
    }

    #[tokio::test]
    async fn test_no_images_and_no_voice_note() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h.submitter(john_doe(Vec::new()), located(), Arc::new(NoVoiceNote));

        let submission = submitter.submit().await.unwrap();

        assert!(submission.report.images.is_empty());
        assert_eq!(submission.report.voice_note, None);
        let body = serde_json::to_value(&submission.report).unwrap();
        assert_eq!(body["voiceNote"], serde_json::Value::Null);
        assert_eq!(body["images"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_failed_image_is_a_null_slot() {
        let h = Harness::new(
            MemoryBlobStore::new().failing_keys("bad"),
            MemoryDocumentStore::new(),
        );
        let submitter = h.submitter(
            john_doe(vec![
                MediaFile::new("good.png", "image/png", vec![1]),
                MediaFile::new("bad.png", "image/png", vec![2]),
            ]),
            located(),
            Arc::new(NoVoiceNote),
        );

        let submission = submitter.submit().await.unwrap();

        assert_eq!(submission.report.images.len(), 2);
        assert!(submission.report.images[0].is_some());
        assert!(submission.report.images[1].is_none());
        assert_eq!(
            h.notifier.messages(),
            [
                "Error uploading bad.png: storage unavailable",
                SUCCESS_MESSAGE
            ]
        );
    }

    #[tokio::test]
    async fn test_two_submissions_write_two_documents() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h.submitter(john_doe(Vec::new()), located(), Arc::new(NoVoiceNote));

        let first = submitter.submit().await.unwrap();
        let second = submitter.submit().await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(h.documents.reports("sosMessages").len(), 2);
    }

    #[tokio::test]
    async fn test_custom_collection_and_message() {
        let h = Harness::new(MemoryBlobStore::new(), MemoryDocumentStore::new());
        let submitter = h
            .submitter(john_doe(Vec::new()), located(), Arc::new(NoVoiceNote))
            .with_settings(ReportConfig {
                collection: "drills".to_string(),
                message: "Drill, no action needed".to_string(),
            });

        submitter.submit().await.unwrap();

        assert!(h.documents.reports("sosMessages").is_empty());
        let drills = h.documents.reports("drills");
        assert_eq!(drills.len(), 1);
        assert_eq!(drills[0].message, "Drill, no action needed");
    }
}
