//! The submission form.
//!
//! The orchestrator reads the form through [`ReportForm`] at the moment of
//! submission, so a live UI can implement it over its own widgets while the
//! CLI hands over a filled-in [`FormInput`].

use std::path::Path;

use crate::error::Result;
use crate::report::DistressType;

/// A file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Original file name, without directories.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// Create a media file from parts.
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Load a file from disk, inferring its type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self {
            content_type: content_type_for(&name).to_string(),
            name,
            bytes,
        })
    }
}

/// MIME type for a file name, by extension.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Read access to the form's current values.
pub trait ReportForm: Send + Sync {
    /// Contents of the name field.
    fn caller_name(&self) -> String;

    /// Contents of the phone field.
    fn caller_number(&self) -> String;

    /// Current selection of the distress type control.
    fn distress_type(&self) -> DistressType;

    /// Files currently chosen in the file picker, in selection order.
    fn image_files(&self) -> Vec<MediaFile>;
}

/// A form whose values are fixed up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    /// Caller name.
    pub caller_name: String,
    /// Caller phone number.
    pub caller_number: String,
    /// Selected distress type.
    pub distress_type: DistressType,
    /// Chosen image files.
    pub images: Vec<MediaFile>,
}

impl ReportForm for FormInput {
    fn caller_name(&self) -> String {
        self.caller_name.clone()
    }

    fn caller_number(&self) -> String {
        self.caller_number.clone()
    }

    fn distress_type(&self) -> DistressType {
        self.distress_type
    }

    fn image_files(&self) -> Vec<MediaFile> {
        self.images.clone()
    }
}
