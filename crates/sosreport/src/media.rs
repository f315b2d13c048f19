//! Media upload.
//!
//! Images are uploaded concurrently and collected in input order. A failed
//! image leaves a `None` in its slot so the result always has one entry per
//! selected file.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, warn};

use crate::backend::BlobStore;
use crate::form::MediaFile;
use crate::report::format_timestamp;
use crate::ui::Notifier;

/// MIME type of recorded voice notes.
pub const VOICE_NOTE_CONTENT_TYPE: &str = "audio/wav";

fn unsafe_name_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[/\\\x00-\x1f\x7f]").expect("valid pattern"))
}

/// Storage key for an image: `images/<timestamp>-<file name>`.
#[must_use]
pub fn image_key(at: DateTime<Utc>, file_name: &str) -> String {
    let name = unsafe_name_chars().replace_all(file_name, "_");
    format!("images/{}-{}", format_timestamp(at), name)
}

/// Storage keys for a batch of images taken at the same instant.
///
/// A name that repeats within the batch gets a counter after the timestamp,
/// so no upload overwrites another.
#[must_use]
pub fn image_keys(at: DateTime<Utc>, files: &[MediaFile]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(files.len());
    files
        .iter()
        .map(|file| {
            let mut key = image_key(at, &file.name);
            let mut n = 1;
            while taken.contains(&key) {
                let name = unsafe_name_chars().replace_all(&file.name, "_");
                key = format!("images/{}-{}-{}", format_timestamp(at), n, name);
                n += 1;
            }
            taken.insert(key.clone());
            key
        })
        .collect()
}

/// Storage key for a voice note: `recordings/<timestamp>.wav`.
#[must_use]
pub fn recording_key(at: DateTime<Utc>) -> String {
    format!("recordings/{}.wav", format_timestamp(at))
}

/// Upload every file, returning one URL slot per file in input order.
///
/// Each failure is reported through `notifier` and leaves `None` in its
/// slot; it does not stop the other uploads.
pub async fn upload_images(
    blobs: &dyn BlobStore,
    files: &[MediaFile],
    notifier: &dyn Notifier,
) -> Vec<Option<String>> {
    let keys = image_keys(Utc::now(), files);
    let uploads = files.iter().zip(keys).map(|(file, key)| async move {
        match blobs.upload(&key, &file.bytes, &file.content_type).await {
            Ok(url) => {
                debug!("Uploaded image {} as {}", file.name, key);
                Some(url)
            }
            Err(err) => {
                warn!("Image upload failed for {}: {}", file.name, err);
                notifier.alert(&format!(
                    "Error uploading {}: {}",
                    file.name,
                    err.user_message()
                ));
                None
            }
        }
    });

    join_all(uploads).await
}

/// Upload a recorded voice note, returning its URL.
///
/// Failure is reported through `notifier` and yields `None`.
pub async fn upload_voice_note(
    blobs: &dyn BlobStore,
    at: DateTime<Utc>,
    audio: &[u8],
    notifier: &dyn Notifier,
) -> Option<String> {
    let key = recording_key(at);
    match blobs.upload(&key, audio, VOICE_NOTE_CONTENT_TYPE).await {
        Ok(url) => {
            debug!("Uploaded voice note ({} bytes) as {}", audio.len(), key);
            Some(url)
        }
        Err(err) => {
            warn!("Voice note upload failed: {}", err);
            notifier.alert(&format!(
                "Error uploading voice note: {}",
                err.user_message()
            ));
            None
        }
    }
}
