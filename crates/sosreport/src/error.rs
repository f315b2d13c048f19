//! Error types for sosreport.
//!
//! This module defines all error types used throughout the sosreport crate,
//! providing detailed context for debugging and user-facing notifications.

use std::path::PathBuf;
use thiserror::Error;

/// A platform capability the report flow depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Audio capture.
    Microphone,
    /// Device position.
    Geolocation,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microphone => write!(f, "microphone"),
            Self::Geolocation => write!(f, "geolocation"),
        }
    }
}

/// The main error type for sosreport operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Capability Errors ===
    /// The platform refused access to a capability.
    #[error("{capability} permission denied: {message}")]
    PermissionDenied {
        /// The capability that was refused.
        capability: Capability,
        /// Description of what went wrong.
        message: String,
    },

    /// The platform has no such capability at all.
    #[error("{capability} not available: {message}")]
    CapabilityUnavailable {
        /// The missing capability.
        capability: Capability,
        /// Description of what went wrong.
        message: String,
    },

    /// The platform gave up waiting for a position fix.
    #[error("location request timed out")]
    LocationTimeout,

    // === Recording Errors ===
    /// A recording session is already active.
    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// There is no recording session to stop.
    #[error("no recording in progress")]
    NotRecording,

    // === Backend Errors ===
    /// A blob upload failed.
    #[error("failed to upload {key}: {message}")]
    Upload {
        /// Storage key of the blob.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A document write failed.
    #[error("failed to write to {collection}: {message}")]
    Write {
        /// Target collection.
        collection: String,
        /// The backend's own message.
        message: String,
    },

    /// A document query failed.
    #[error("failed to read {collection}: {message}")]
    Read {
        /// Queried collection.
        collection: String,
        /// The backend's own message.
        message: String,
    },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for sosreport operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a permission denied error.
    #[must_use]
    pub fn permission_denied(capability: Capability, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            capability,
            message: message.into(),
        }
    }

    /// Create a capability unavailable error.
    #[must_use]
    pub fn unavailable(capability: Capability, message: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability,
            message: message.into(),
        }
    }

    /// Create an upload error for the given storage key.
    #[must_use]
    pub fn upload(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upload {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a document write error.
    #[must_use]
    pub fn write(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a document read error.
    #[must_use]
    pub fn read(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if this error came from acquiring the device position.
    #[must_use]
    pub fn is_location_error(&self) -> bool {
        match self {
            Self::PermissionDenied { capability, .. }
            | Self::CapabilityUnavailable { capability, .. } => {
                *capability == Capability::Geolocation
            }
            Self::LocationTimeout => true,
            _ => false,
        }
    }

    /// The message to show a user.
    ///
    /// Backend failures surface the backend's own text; everything else
    /// uses the display form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Upload { message, .. }
            | Self::Write { message, .. }
            | Self::Read { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
