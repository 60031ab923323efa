//! UI/worker events and error modeling for the desktop controller.

use upload_core::UploadPhase;

/// Everything the worker thread can tell the UI thread. Progress and phase
/// changes mirror the upload session; `FileLoaded` carries the decoded
/// content itself and arrives through the controller callback rather than
/// the session event stream.
pub enum UiEvent {
    WorkerReady,
    Info(String),
    Error(UiError),
    UploadPhase(UploadPhase),
    UploadProgress { percent: u8, message: &'static str },
    UploadFinished { file_name: String },
    UploadFailed { file_name: String, reason: String },
    FileLoaded { content: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    WorkerStartup,
    Ingest,
}

#[derive(Debug, Clone)]
pub struct UiError {
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
