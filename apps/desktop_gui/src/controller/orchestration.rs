//! Command orchestration helpers from UI actions to the worker queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::worker_bridge::commands::WorkerCommand;

pub fn dispatch_worker_command(
    cmd_tx: &Sender<WorkerCommand>,
    cmd: WorkerCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        WorkerCommand::Ingest { .. } => "ingest",
        WorkerCommand::PickFile => "pick_file",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->worker command"),
        Err(TrySendError::Full(_)) => {
            *status = "Upload queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Upload worker disconnected (possible startup failure); restart the app"
                .to_string();
        }
    }
}
