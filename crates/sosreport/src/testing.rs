//! Test doubles shared across module tests.

use std::sync::Mutex;

use tokio::sync::{mpsc, Semaphore};

use crate::backend::{BlobStore, MemoryBlobStore};
use crate::error::{Capability, Error, Result};
use crate::geolocation::Geolocator;
use crate::microphone::{AudioStream, Microphone};
use crate::report::Location;
use crate::ui::{Notifier, TimerDisplay};

/// Notifier that remembers every alert.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Timer display that remembers every frame.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    frames: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl TimerDisplay for RecordingDisplay {
    fn show(&self, text: &str) {
        self.frames.lock().unwrap().push(text.to_string());
    }
}

/// Microphone that replays fixed chunks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMicrophone {
    chunks: Vec<Vec<u8>>,
    hold_open: bool,
    denied: bool,
}

impl ScriptedMicrophone {
    /// Emits `chunks` and then ends the stream.
    pub fn ending(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            ..Self::default()
        }
    }

    /// Emits `chunks` and keeps the stream open until the reader goes away.
    pub fn live(chunks: &[&[u8]]) -> Self {
        Self {
            hold_open: true,
            ..Self::ending(chunks)
        }
    }

    /// Refuses access.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl Microphone for ScriptedMicrophone {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open(&self) -> Result<AudioStream> {
        if self.denied {
            return Err(Error::permission_denied(
                Capability::Microphone,
                "Permission denied",
            ));
        }

        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            tx.try_send(chunk.clone()).unwrap();
        }
        if self.hold_open {
            tokio::spawn(async move { tx.closed().await });
        }
        Ok(rx)
    }
}

/// Geolocator that always fails with the given error.
#[derive(Debug, Clone, Copy)]
pub enum FailingGeolocator {
    Denied,
    TimedOut,
}

#[async_trait::async_trait]
impl Geolocator for FailingGeolocator {
    async fn current_position(&self) -> Result<Location> {
        match self {
            Self::Denied => Err(Error::permission_denied(
                Capability::Geolocation,
                "User denied Geolocation",
            )),
            Self::TimedOut => Err(Error::LocationTimeout),
        }
    }
}

/// Blob store whose uploads wait until [`release`](Self::release) is called.
#[derive(Debug)]
pub struct GatedBlobStore {
    gate: Semaphore,
    inner: MemoryBlobStore,
}

impl GatedBlobStore {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            inner: MemoryBlobStore::new(),
        }
    }

    /// Let one upload through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }
}

#[async_trait::async_trait]
impl BlobStore for GatedBlobStore {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.gate.acquire().await.unwrap().forget();
        self.inner.upload(key, bytes, content_type).await
    }
}
