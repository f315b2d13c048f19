//! Voice note recording.
//!
//! A [`Recorder`] runs at most one session at a time. While a session is
//! live two tasks run side by side: a collector that accumulates audio
//! chunks and a countdown that redraws the timer once a second and forces
//! a stop at zero. Stopping cancels both, assembles the chunks into one
//! clip and uploads it; the resulting URL is cached until the next
//! recording replaces it.
//!
//! Each session carries a generation id. A countdown or source-end event
//! that fires after its session was already stopped is ignored.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::BlobStore;
use crate::error::{Error, Result};
use crate::media::upload_voice_note;
use crate::microphone::{AudioStream, Microphone};
use crate::ui::{format_countdown, Notifier, TimerDisplay};

/// Read access to the most recent voice note.
pub trait VoiceNoteSource: Send + Sync {
    /// URL of the uploaded voice note, if there is one.
    fn voice_note_url(&self) -> Option<String>;
}

/// A source that never has a voice note.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVoiceNote;

impl VoiceNoteSource for NoVoiceNote {
    fn voice_note_url(&self) -> Option<String> {
        None
    }
}

/// Whether a session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderStatus {
    /// No session.
    #[default]
    Idle,
    /// A session is capturing audio.
    Recording,
}

impl fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    User,
    Countdown,
    SourceEnded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "stopped by user"),
            Self::Countdown => write!(f, "countdown expired"),
            Self::SourceEnded => write!(f, "audio source ended"),
        }
    }
}

struct Session {
    id: u64,
    stop: oneshot::Sender<()>,
    collector: JoinHandle<Vec<Vec<u8>>>,
    countdown: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    generation: u64,
    voice_note: Option<String>,
}

struct Shared {
    microphone: Arc<dyn Microphone>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
    display: Arc<dyn TimerDisplay>,
    countdown: Duration,
    state: Mutex<State>,
    status: watch::Sender<RecorderStatus>,
}

/// Voice note recorder.
///
/// Cloning yields another handle to the same recorder.
#[derive(Clone)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("microphone", &self.shared.microphone.name())
            .field("blobs", &self.shared.blobs.name())
            .field("countdown", &self.shared.countdown)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Create an idle recorder.
    ///
    /// The display immediately shows the full countdown.
    #[must_use]
    pub fn new(
        microphone: Arc<dyn Microphone>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        display: Arc<dyn TimerDisplay>,
        countdown: Duration,
    ) -> Self {
        let (status, _) = watch::channel(RecorderStatus::Idle);
        display.show(&format_countdown(countdown.as_secs()));
        Self {
            shared: Arc::new(Shared {
                microphone,
                blobs,
                notifier,
                display,
                countdown,
                state: Mutex::new(State::default()),
                status,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> RecorderStatus {
        *self.shared.status.borrow()
    }

    /// Check if a session is live.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.status() == RecorderStatus::Recording
    }

    /// Start a session if idle, stop it otherwise.
    ///
    /// Pressing the button while a stopped session is still uploading does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`start`](Self::start) or
    /// [`stop`](Self::stop).
    pub async fn toggle(&self) -> Result<()> {
        if !self.is_recording() {
            return self.start().await;
        }
        match self.stop().await {
            Ok(_) => Ok(()),
            Err(Error::NotRecording) => {
                debug!("Toggle ignored; the last session is still uploading");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Open the microphone and begin a session.
    ///
    /// A microphone failure is reported through the notifier and leaves
    /// the recorder idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRecording`] if a session is live, or the
    /// microphone's error.
    pub async fn start(&self) -> Result<()> {
        if self.is_recording() {
            return Err(Error::AlreadyRecording);
        }

        let stream = match self.shared.microphone.open().await {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Microphone {} failed: {}", self.shared.microphone.name(), err);
                self.shared
                    .notifier
                    .alert(&format!("Error accessing microphone: {}", err.user_message()));
                return Err(err);
            }
        };

        let mut state = self.state();
        if state.session.is_some() {
            return Err(Error::AlreadyRecording);
        }
        state.generation += 1;
        let id = state.generation;

        let (stop, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(self.clone().collect(id, stream, stop_rx));
        let countdown = tokio::spawn(self.clone().count_down(id));
        state.session = Some(Session {
            id,
            stop,
            collector,
            countdown,
        });
        self.shared.status.send_replace(RecorderStatus::Recording);
        drop(state);

        info!("Recording session {} started", id);
        Ok(())
    }

    /// Stop the live session and upload what it captured.
    ///
    /// Returns the voice note URL, or `None` if nothing was captured or the
    /// upload failed (the failure is reported through the notifier).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRecording`] if no session is live.
    pub async fn stop(&self) -> Result<Option<String>> {
        self.finish(None, StopReason::User).await
    }

    /// Wait until no session is live, including the final upload.
    pub async fn wait_idle(&self) {
        let mut status = self.shared.status.subscribe();
        let _ = status
            .wait_for(|status| *status == RecorderStatus::Idle)
            .await;
    }

    /// Forget the cached voice note.
    pub fn clear_voice_note(&self) {
        self.state().voice_note = None;
    }

    async fn collect(
        self,
        id: u64,
        mut stream: AudioStream,
        mut stop: oneshot::Receiver<()>,
    ) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        loop {
            tokio::select! {
                _ = &mut stop => {
                    while let Ok(chunk) = stream.try_recv() {
                        chunks.push(chunk);
                    }
                    break;
                }
                chunk = stream.recv() => match chunk {
                    Some(chunk) => chunks.push(chunk),
                    None => {
                        self.finish_in_background(id, StopReason::SourceEnded);
                        break;
                    }
                },
            }
        }
        chunks
    }

    async fn count_down(self, id: u64) {
        let mut remaining = self.shared.countdown.as_secs();
        while remaining > 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            remaining -= 1;

            let state = self.state();
            if state.session.as_ref().map(|s| s.id) != Some(id) {
                return;
            }
            self.shared.display.show(&format_countdown(remaining));
        }
        self.finish_in_background(id, StopReason::Countdown);
    }

    // Runs the stop on its own task so the countdown or collector never
    // waits on itself.
    fn finish_in_background(&self, id: u64, reason: StopReason) {
        let recorder = self.clone();
        tokio::spawn(async move {
            if let Err(err) = recorder.finish(Some(id), reason).await {
                debug!("Session {} already finished: {}", id, err);
            }
        });
    }

    async fn finish(&self, expected: Option<u64>, reason: StopReason) -> Result<Option<String>> {
        let session = {
            let mut state = self.state();
            let session = match state.session.take() {
                Some(session) if expected.map_or(true, |id| id == session.id) => session,
                Some(current) => {
                    debug!(
                        "Ignoring {} for stale session (current is {})",
                        reason, current.id
                    );
                    state.session = Some(current);
                    return Ok(None);
                }
                None => return Err(Error::NotRecording),
            };
            session.countdown.abort();
            self.shared
                .display
                .show(&format_countdown(self.shared.countdown.as_secs()));
            session
        };
        info!("Recording session {} ended: {}", session.id, reason);

        let _ = session.stop.send(());
        let chunks = session
            .collector
            .await
            .map_err(|e| Error::internal(format!("audio collector failed: {e}")))?;
        let audio = chunks.concat();

        let url = if audio.is_empty() {
            warn!("Session {} captured no audio; nothing to upload", session.id);
            None
        } else {
            upload_voice_note(
                self.shared.blobs.as_ref(),
                Utc::now(),
                &audio,
                self.shared.notifier.as_ref(),
            )
            .await
        };

        let mut state = self.state();
        state.voice_note.clone_from(&url);
        if state.session.is_none() {
            self.shared.status.send_replace(RecorderStatus::Idle);
        }
        Ok(url)
    }
}

impl VoiceNoteSource for Recorder {
    fn voice_note_url(&self) -> Option<String> {
        self.state().voice_note.clone()
    }
}
