//! `sosreport` - emergency SOS reporting
//!
//! This library captures an SOS report (caller details, device position,
//! an optional voice note and images), uploads its media, writes it as a
//! single document, and lists submitted reports newest first. Every
//! platform surface (form, microphone, position, stores, alerts) sits
//! behind a trait so the flows run the same against Firebase, a local
//! SQLite store or memory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod geolocation;
pub mod listing;
pub mod logging;
pub mod media;
pub mod microphone;
pub mod recorder;
pub mod render;
pub mod report;
pub mod storage;
pub mod submit;
pub mod ui;

#[cfg(test)]
mod testing;

pub use backend::{Backends, BlobStore, DocumentStore};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use recorder::{Recorder, RecorderStatus, VoiceNoteSource};
pub use report::{DistressType, Location, Report};
pub use storage::Storage;
pub use submit::{Submission, Submitter};
