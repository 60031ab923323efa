//! Runtime bridge between the UI command queue and the upload controller.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use upload_core::{FileRef, UploadController, UploadEvent, ACCEPTED_EXTENSIONS};

use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::worker_bridge::commands::WorkerCommand;

/// Spawn the worker thread. It builds its own multi-thread runtime, forwards
/// session events to the UI channel, and processes commands until the command
/// sender is dropped.
pub fn launch(
    uploader: Arc<UploadController>,
    cmd_rx: Receiver<WorkerCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Upload worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::WorkerStartup,
                    format!("upload worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build upload worker runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut events = uploader.subscribe_events();
            let ui_tx_clone = ui_tx.clone();
            let event_task = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        UploadEvent::PhaseChanged(phase) => UiEvent::UploadPhase(phase),
                        UploadEvent::ProgressStepped { percent, message } => {
                            UiEvent::UploadProgress { percent, message }
                        }
                        UploadEvent::Loaded { file_name } => UiEvent::UploadFinished { file_name },
                        UploadEvent::Failed { file_name, reason } => {
                            UiEvent::UploadFailed { file_name, reason }
                        }
                    };
                    let _ = ui_tx_clone.try_send(evt);
                }
            });

            let _ = ui_tx.try_send(UiEvent::WorkerReady);

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    WorkerCommand::Ingest { files } => {
                        tracing::info!(count = files.len(), "worker: ingest");
                        run_ingest(&uploader, &ui_tx, files).await;
                    }
                    WorkerCommand::PickFile => {
                        tracing::info!("worker: pick_file");
                        let picked = rfd::FileDialog::new()
                            .add_filter("Supported files", &ACCEPTED_EXTENSIONS)
                            .pick_file();
                        match picked {
                            Some(path) => {
                                run_ingest(&uploader, &ui_tx, vec![FileRef::from_path(path)]).await;
                            }
                            None => tracing::debug!("worker: pick_file cancelled"),
                        }
                    }
                }
            }

            event_task.abort();
        });
    });
}

async fn run_ingest(uploader: &UploadController, ui_tx: &Sender<UiEvent>, files: Vec<FileRef>) {
    if let Err(err) = uploader.ingest(files).await {
        tracing::warn!("worker: ingest rejected: {err}");
        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
            UiErrorContext::Ingest,
            format!("Upload not started: {err}"),
        )));
    }
}
