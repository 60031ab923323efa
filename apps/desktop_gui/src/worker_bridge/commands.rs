//! Commands queued from the UI thread to the upload worker.

use upload_core::FileRef;

pub enum WorkerCommand {
    Ingest { files: Vec<FileRef> },
    PickFile,
}
