//! Upload session state machine.
//!
//! [`UploadController`] owns a single session slot and drives it through the
//! visible lifecycle: drag tracking, the simulated progress sequence, the real
//! content read, and the one-shot completion callback. Observers follow along
//! on a broadcast event stream; the decoded content itself only travels
//! through the callback.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod progress;
pub mod reader;

pub use progress::{
    stage_index, stage_message, ProgressPlan, ProgressTick, StepPacer, TokioPacer, PROGRESS_STEP,
    STAGE_MESSAGES, STEP_DELAY,
};
pub use reader::{
    ContentReader, FilePayload, FileRef, FsContentReader, ReadFailure, ACCEPTED_EXTENSIONS,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Discrete state of the upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Dragging,
    Processing,
    Done,
    Failed,
}

/// Point-in-time view of the session for polling consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: UploadPhase,
    pub progress: u8,
    pub message: &'static str,
}

/// Events emitted while a session runs. `Done` and `Failed` are transient:
/// they appear here, then the session settles back to `Idle`.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    PhaseChanged(UploadPhase),
    ProgressStepped { percent: u8, message: &'static str },
    Loaded { file_name: String },
    Failed { file_name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("another upload session is already processing")]
    SessionActive,
}

struct SessionState {
    phase: UploadPhase,
    progress: u8,
    message: &'static str,
}

pub struct UploadController {
    inner: Mutex<SessionState>,
    pacer: Arc<dyn StepPacer>,
    reader: Arc<dyn ContentReader>,
    on_file_loaded: Box<dyn Fn(String) + Send + Sync>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadController {
    pub fn new(on_file_loaded: impl Fn(String) + Send + Sync + 'static) -> Arc<Self> {
        Self::new_with_dependencies(Arc::new(TokioPacer), Arc::new(FsContentReader), on_file_loaded)
    }

    pub fn new_with_dependencies(
        pacer: Arc<dyn StepPacer>,
        reader: Arc<dyn ContentReader>,
        on_file_loaded: impl Fn(String) + Send + Sync + 'static,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            inner: Mutex::new(SessionState {
                phase: UploadPhase::Idle,
                progress: 0,
                message: "",
            }),
            pacer,
            reader,
            on_file_loaded: Box::new(on_file_loaded),
            events,
        })
    }

    // Lock scopes stay short and never cross an await, so poisoning is
    // unreachable; recover instead of propagating a panic.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Files started hovering over the surface. Only moves `Idle` sessions;
    /// an empty hover set is ignored.
    pub fn drag_entered(&self, file_count: usize) {
        if file_count == 0 {
            return;
        }
        let changed = {
            let mut state = self.lock();
            if state.phase == UploadPhase::Idle {
                state.phase = UploadPhase::Dragging;
                true
            } else {
                false
            }
        };
        if changed {
            self.emit_phase(UploadPhase::Dragging);
        }
    }

    /// The hover left without a drop.
    pub fn drag_left(&self) {
        let changed = {
            let mut state = self.lock();
            if state.phase == UploadPhase::Dragging {
                state.phase = UploadPhase::Idle;
                true
            } else {
                false
            }
        };
        if changed {
            self.emit_phase(UploadPhase::Idle);
        }
    }

    /// Run one session for the first file of `files`.
    ///
    /// An empty list is a no-op. A call while another session is processing
    /// is rejected and leaves the running session untouched. Otherwise the
    /// session steps through the full progress plan, reads the file, and on
    /// success invokes the completion callback exactly once before settling
    /// back to `Idle`.
    pub async fn ingest(&self, files: Vec<FileRef>) -> Result<(), UploadError> {
        let total = files.len();
        let Some(first) = files.into_iter().next() else {
            return Ok(());
        };

        {
            let mut state = self.lock();
            if state.phase == UploadPhase::Processing {
                return Err(UploadError::SessionActive);
            }
            state.phase = UploadPhase::Processing;
            state.progress = 0;
            state.message = stage_message(0);
        }
        self.emit_phase(UploadPhase::Processing);

        if total > 1 {
            info!(
                file = %first.name,
                ignored = total - 1,
                "upload: session started, extra files ignored"
            );
        } else {
            info!(file = %first.name, "upload: session started");
        }

        for tick in ProgressPlan::new() {
            {
                let mut state = self.lock();
                state.progress = tick.percent;
                state.message = tick.message;
            }
            let _ = self.events.send(UploadEvent::ProgressStepped {
                percent: tick.percent,
                message: tick.message,
            });
            self.pacer.pause().await;
        }

        match self.reader.read_text(&first).await {
            Ok(content) => {
                self.set_phase(UploadPhase::Done);
                info!(file = %first.name, bytes = content.len(), "upload: content loaded");
                let _ = self.events.send(UploadEvent::Loaded {
                    file_name: first.name.clone(),
                });
                (self.on_file_loaded)(content);
            }
            Err(err) => {
                self.set_phase(UploadPhase::Failed);
                warn!(file = %first.name, "upload: read failed: {err}");
                let _ = self.events.send(UploadEvent::Failed {
                    file_name: first.name.clone(),
                    reason: err.to_string(),
                });
            }
        }

        self.reset();
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            phase: state.phase,
            progress: state.progress,
            message: state.message,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    fn set_phase(&self, phase: UploadPhase) {
        {
            let mut state = self.lock();
            state.phase = phase;
        }
        self.emit_phase(phase);
    }

    fn reset(&self) {
        {
            let mut state = self.lock();
            state.phase = UploadPhase::Idle;
            state.progress = 0;
            state.message = "";
        }
        self.emit_phase(UploadPhase::Idle);
    }

    fn emit_phase(&self, phase: UploadPhase) {
        let _ = self.events.send(UploadEvent::PhaseChanged(phase));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
