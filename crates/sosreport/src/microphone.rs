//! Audio input.
//!
//! A [`Microphone`] yields a stream of audio chunks once access is granted.
//! The stream ends when the input goes away; the recorder treats that the
//! same as the user pressing stop.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Capability, Error, Result};

/// Chunks of encoded audio, in capture order.
pub type AudioStream = mpsc::Receiver<Vec<u8>>;

/// An audio capture device.
#[async_trait::async_trait]
pub trait Microphone: Send + Sync {
    /// The name of this input (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Request access and start capturing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or [`Error::CapabilityUnavailable`]
    /// if audio cannot be captured.
    async fn open(&self) -> Result<AudioStream>;
}

/// Byte rate from a RIFF/WAVE header's `fmt ` chunk.
#[must_use]
pub fn wav_byte_rate(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?);
        let data = offset + 8;
        if id == b"fmt " {
            let rate = bytes.get(data + 8..data + 12)?;
            let rate = u32::from_le_bytes(rate.try_into().ok()?);
            return (rate > 0).then_some(u64::from(rate));
        }
        // Chunks are padded to an even length.
        let size = usize::try_from(size).ok()?;
        offset = data.checked_add(size)?.checked_add(size % 2)?;
    }
    None
}

/// Time one chunk of `chunk_size` bytes takes to play at `bytes_per_sec`.
fn chunk_interval(chunk_size: usize, bytes_per_sec: u64) -> Duration {
    let chunk = u64::try_from(chunk_size).unwrap_or(u64::MAX);
    let nanos = u128::from(chunk) * 1_000_000_000 / u128::from(bytes_per_sec.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Streams a pre-recorded audio file as if it were live input.
///
/// Chunks are released at the file's playback rate, so a countdown cuts a
/// long file the same way it cuts a live recording.
#[derive(Debug, Clone)]
pub struct FileMicrophone {
    path: Option<PathBuf>,
    chunk_size: usize,
    bytes_per_sec: u64,
}

impl FileMicrophone {
    /// Stream `path` in chunks of `chunk_size` bytes.
    ///
    /// WAV files play at the byte rate in their header; anything else
    /// plays at `bytes_per_sec`.
    #[must_use]
    pub fn new(path: Option<PathBuf>, chunk_size: usize, bytes_per_sec: u64) -> Self {
        Self {
            path,
            chunk_size: chunk_size.max(1),
            bytes_per_sec: bytes_per_sec.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Microphone for FileMicrophone {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn open(&self) -> Result<AudioStream> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::unavailable(Capability::Microphone, "no audio input configured"))?;

        let bytes = tokio::fs::read(path).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                Error::permission_denied(Capability::Microphone, err.to_string())
            }
            std::io::ErrorKind::NotFound => Error::unavailable(
                Capability::Microphone,
                format!("{} not found", path.display()),
            ),
            _ => Error::Io(err),
        })?;
        let rate = wav_byte_rate(&bytes).unwrap_or(self.bytes_per_sec);
        debug!(
            "Streaming {} ({} bytes at {} bytes/s)",
            path.display(),
            bytes.len(),
            rate
        );

        let (tx, rx) = mpsc::channel(16);
        let chunk_size = self.chunk_size;
        let interval = chunk_interval(chunk_size, rate);
        tokio::spawn(async move {
            for chunk in bytes.chunks(chunk_size) {
                if tx.send(chunk.to_vec()).await.is_err() {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });
        Ok(rx)
    }
}
