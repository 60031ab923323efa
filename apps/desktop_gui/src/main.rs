mod controller;
mod ui;
mod worker_bridge;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use theme_sync::ThemeMarker;
use tracing_subscriber::EnvFilter;
use upload_core::UploadController;

use crate::controller::events::UiEvent;
use crate::ui::{GlassdropApp, StartupConfig};
use crate::worker_bridge::commands::WorkerCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl ThemeArg {
    fn marker(self) -> ThemeMarker {
        match self {
            ThemeArg::Dark => ThemeMarker::Dark,
            ThemeArg::Light => ThemeMarker::Light,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "glassdrop", about = "Drag-and-drop upload surface")]
struct Args {
    /// Start with a fixed theme instead of the persisted or system one.
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Directory for persisted settings; defaults to the platform data dir.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Disable the ambient background particles.
    #[arg(long)]
    no_particles: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let startup = StartupConfig {
        data_dir: args.data_dir,
        theme_override: args.theme.map(ThemeArg::marker),
        particles_enabled: !args.no_particles,
    };

    let (cmd_tx, cmd_rx) = bounded::<WorkerCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);

    let callback_tx = ui_tx.clone();
    let uploader = UploadController::new(move |content| {
        let _ = callback_tx.try_send(UiEvent::FileLoaded { content });
    });

    worker_bridge::runtime::launch(Arc::clone(&uploader), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Glassdrop")
            .with_inner_size([900.0, 720.0])
            .with_min_inner_size([640.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Glassdrop",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(GlassdropApp::bootstrap(
                cmd_tx, ui_rx, uploader, startup,
            )))
        }),
    )
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, ThemeArg, ThemeMarker};

    #[test]
    fn args_declare_expected_flags() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_theme_and_particles_flags() {
        let args = Args::try_parse_from(["glassdrop", "--theme", "dark", "--no-particles"])
            .expect("parse");
        assert_eq!(args.theme, Some(ThemeArg::Dark));
        assert!(args.no_particles);
        assert!(args.data_dir.is_none());
    }

    #[test]
    fn theme_args_map_to_markers() {
        assert_eq!(ThemeArg::Dark.marker(), ThemeMarker::Dark);
        assert_eq!(ThemeArg::Light.marker(), ThemeMarker::Light);
    }
}
