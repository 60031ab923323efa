use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arboard::Clipboard;
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use theme_sync::{
    MarkerBoard, MarkerSet, SchemeProbe, SchemeSource, ThemeIndicator, ThemeMarker,
    ThemeSynchronizer,
};
use upload_core::{
    stage_index, FileRef, UploadController, UploadPhase, ACCEPTED_EXTENSIONS, STAGE_MESSAGES,
};

use crate::controller::events::{UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_worker_command;
use crate::ui::particles::{particle_field, particle_pos, Particle, PARTICLE_COUNT};
use crate::worker_bridge::commands::WorkerCommand;

const PARTICLE_SEED: u64 = 0x64726f70;
const PREVIEW_CHAR_LIMIT: usize = 20_000;

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub data_dir: Option<PathBuf>,
    pub theme_override: Option<ThemeMarker>,
    pub particles_enabled: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            theme_override: None,
            particles_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_root: PathBuf,
    pub settings_path: PathBuf,
}

impl AppPaths {
    pub fn from_startup(startup: &StartupConfig) -> anyhow::Result<Self> {
        let root = if let Some(path) = &startup.data_dir {
            path.clone()
        } else {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to resolve local app data dir"))?;
            base.join("glassdrop")
        };

        Ok(Self {
            settings_path: root.join("settings.json"),
            data_root: root,
        })
    }
}

/// Settings persisted across launches as JSON under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub markers: MarkerSet,
    pub particles_enabled: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            markers: MarkerSet::default(),
            particles_enabled: true,
        }
    }
}

impl SurfaceSettings {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                tracing::warn!("settings file at {} is unreadable: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("could not prepare settings dir {}: {err}", parent.display());
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(serialized) => {
                if let Err(err) = std::fs::write(path, serialized) {
                    tracing::warn!("could not persist settings to {}: {err}", path.display());
                }
            }
            Err(err) => tracing::warn!("could not serialize settings: {err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

fn err_label(context: UiErrorContext) -> &'static str {
    match context {
        UiErrorContext::WorkerStartup => "Worker startup",
        UiErrorContext::Ingest => "Upload",
    }
}

fn lighten_color(c: egui::Color32, t: f32) -> egui::Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let channel = channel as f32;
        (channel + (255.0 - channel) * t).round().clamp(0.0, 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(mix(c.r()), mix(c.g()), mix(c.b()), c.a())
}

/// Decoded text sitting in the result card.
struct LoadedContent {
    file_name: String,
    content: String,
    size_bytes: u64,
    mime_label: String,
    loaded_at: DateTime<Local>,
}

impl LoadedContent {
    fn new(file_name: String, content: String) -> Self {
        let mime_label = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("text/plain")
            .to_string();
        let size_bytes = content.len() as u64;
        Self {
            file_name,
            content,
            size_bytes,
            mime_label,
            loaded_at: Local::now(),
        }
    }

    fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

#[derive(Debug, Clone)]
struct FailureNotice {
    file_name: String,
    reason: String,
}

/// Mirror of the upload session as seen from the UI thread. The finished-name
/// event and the content callback race on the UI channel, so both halves are
/// buffered and the result card is sealed once the pair is complete.
struct UploadViewState {
    phase: UploadPhase,
    progress: u8,
    message: &'static str,
    drag_over: bool,
    pending_name: Option<String>,
    pending_content: Option<String>,
    result: Option<LoadedContent>,
    failure: Option<FailureNotice>,
}

impl UploadViewState {
    fn new() -> Self {
        Self {
            phase: UploadPhase::Idle,
            progress: 0,
            message: "",
            drag_over: false,
            pending_name: None,
            pending_content: None,
            result: None,
            failure: None,
        }
    }

    fn try_seal_result(&mut self) {
        if self.pending_name.is_some() && self.pending_content.is_some() {
            let file_name = self.pending_name.take().unwrap_or_default();
            let content = self.pending_content.take().unwrap_or_default();
            self.result = Some(LoadedContent::new(file_name, content));
            self.failure = None;
        }
    }
}

pub struct GlassdropApp {
    cmd_tx: Sender<WorkerCommand>,
    ui_rx: Receiver<UiEvent>,
    uploader: Arc<UploadController>,
    theme: ThemeSynchronizer,
    board: Arc<MarkerBoard>,
    probe: Arc<SchemeProbe>,
    paths: Option<AppPaths>,
    settings: SurfaceSettings,
    status: String,
    status_banner: Option<StatusBanner>,
    applied_dark: Option<bool>,
    view: UploadViewState,
    particles: Vec<Particle>,
    particles_allowed: bool,
    theme_observed: bool,
    worker_ready: bool,
    settings_open: bool,
}

impl GlassdropApp {
    pub fn bootstrap(
        cmd_tx: Sender<WorkerCommand>,
        ui_rx: Receiver<UiEvent>,
        uploader: Arc<UploadController>,
        startup: StartupConfig,
    ) -> Self {
        let paths = match AppPaths::from_startup(&startup) {
            Ok(paths) => Some(paths),
            Err(err) => {
                tracing::warn!("settings are not persisted this session: {err:#}");
                None
            }
        };
        let settings = paths
            .as_ref()
            .map(|paths| SurfaceSettings::load(&paths.settings_path))
            .unwrap_or_default();

        let board = Arc::new(MarkerBoard::with_markers(startup_markers(
            startup.theme_override,
            settings.markers,
        )));
        let probe = Arc::new(SchemeProbe::new());
        let theme = ThemeSynchronizer::new(
            Arc::clone(&board) as Arc<dyn ThemeIndicator>,
            Arc::clone(&probe) as Arc<dyn SchemeSource>,
        );

        Self {
            cmd_tx,
            ui_rx,
            uploader,
            theme,
            board,
            probe,
            paths,
            settings,
            status: "Starting upload worker".to_string(),
            status_banner: None,
            applied_dark: None,
            view: UploadViewState::new(),
            particles: particle_field(PARTICLE_SEED, PARTICLE_COUNT),
            particles_allowed: startup.particles_enabled,
            theme_observed: false,
            worker_ready: false,
            settings_open: false,
        }
    }

    fn particles_active(&self) -> bool {
        self.particles_allowed && self.settings.particles_enabled && !self.particles.is_empty()
    }

    fn persist_settings(&self) {
        if let Some(paths) = &self.paths {
            self.settings.save(&paths.settings_path);
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::WorkerReady => {
                    self.worker_ready = true;
                    self.status = "Ready".to_string();
                }
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.status = format!("{} error: {}", err_label(err.context()), err.message());
                    if err.context() == UiErrorContext::WorkerStartup {
                        self.status_banner = Some(StatusBanner {
                            severity: StatusBannerSeverity::Error,
                            message: self.status.clone(),
                        });
                    }
                }
                UiEvent::UploadPhase(phase) => {
                    if phase == UploadPhase::Processing {
                        self.view.result = None;
                        self.view.failure = None;
                        self.view.pending_name = None;
                        self.view.pending_content = None;
                        self.view.drag_over = false;
                    }
                    self.view.phase = phase;
                }
                UiEvent::UploadProgress { percent, message } => {
                    self.view.progress = percent;
                    self.view.message = message;
                }
                UiEvent::UploadFinished { file_name } => {
                    self.status = format!("Loaded {file_name}");
                    self.view.pending_name = Some(file_name);
                    self.view.try_seal_result();
                }
                UiEvent::UploadFailed { file_name, reason } => {
                    self.status = format!("Failed to read {file_name}");
                    self.view.failure = Some(FailureNotice { file_name, reason });
                    self.view.pending_name = None;
                    self.view.pending_content = None;
                }
                UiEvent::FileLoaded { content } => {
                    self.view.pending_content = Some(content);
                    self.view.try_seal_result();
                }
            }
        }
    }

    fn feed_system_scheme(&self, ctx: &egui::Context) {
        let system = ctx.input(|i| i.raw.system_theme);
        self.probe
            .feed(system.map(|theme| theme == egui::Theme::Dark));
    }

    fn apply_theme_if_needed(&mut self, ctx: &egui::Context) {
        let dark = self.theme.is_dark();
        if self.applied_dark == Some(dark) {
            return;
        }

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals_for_surface(dark);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(10.0, 6.0);
        style.spacing.interact_size = egui::vec2(40.0, 30.0);
        ctx.set_style(style);
        self.applied_dark = Some(dark);
        tracing::debug!(dark, "surface: applied visuals");
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if !dropped.is_empty() {
            self.view.drag_over = false;
            if self.view.phase == UploadPhase::Processing {
                self.status = "Upload already in progress".to_string();
                return;
            }
            let files: Vec<FileRef> = dropped.iter().filter_map(dropped_file_ref).collect();
            if files.is_empty() {
                self.status = "Dropped item had no readable file".to_string();
                self.uploader.drag_left();
                return;
            }
            dispatch_worker_command(
                &self.cmd_tx,
                WorkerCommand::Ingest { files },
                &mut self.status,
            );
            return;
        }

        if self.view.phase == UploadPhase::Processing {
            self.view.drag_over = false;
            return;
        }

        let hovering = ctx.input(|i| i.raw.hovered_files.len());
        if hovering > 0 && !self.view.drag_over {
            self.view.drag_over = true;
            self.uploader.drag_entered(hovering);
        } else if hovering == 0 && self.view.drag_over {
            self.view.drag_over = false;
            self.uploader.drag_left();
        }
    }

    fn show_splash(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space((ui.available_height() * 0.42).max(24.0));
            ui.vertical_centered(|ui| {
                ui.add(egui::Spinner::new().size(28.0));
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Preparing surface...").weak());
            });
        });
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        let mut toggle_requested = false;
        egui::TopBottomPanel::top("surface_top_bar")
            .resizable(false)
            .exact_height(40.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new("Glassdrop").strong().size(16.0));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Settings").clicked() {
                            self.settings_open = !self.settings_open;
                        }
                        let toggle_label = if self.theme.is_dark() { "Light" } else { "Dark" };
                        if ui.button(toggle_label).clicked() {
                            toggle_requested = true;
                        }
                    });
                });
            });

        if toggle_requested {
            self.theme.toggle_theme();
            self.settings.markers = self.board.markers();
            self.persist_settings();
        }
    }

    fn show_bottom_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("surface_status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new(&self.status).size(11.0).weak());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let scheme = if self.theme.is_dark() { "Dark" } else { "Light" };
                        ui.label(egui::RichText::new(scheme).size(11.0).weak());
                    });
                });
            });
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn paint_particles(&self, ui: &mut egui::Ui) {
        let rect = ui.max_rect();
        let time = ui.input(|i| i.time);
        let color = if self.theme.is_dark() {
            egui::Color32::from_rgba_unmultiplied(122, 162, 247, 26)
        } else {
            egui::Color32::from_rgba_unmultiplied(59, 110, 201, 22)
        };
        for particle in &self.particles {
            let pos = particle_pos(particle, rect, time);
            ui.painter().circle_filled(pos, particle.radius, color);
        }
    }

    fn show_main_surface(&mut self, ctx: &egui::Context) {
        self.show_top_bar(ctx);
        self.show_bottom_status(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.particles_active() {
                self.paint_particles(ui);
            }

            self.show_status_banner(ui);

            let highlighted = self.view.drag_over || self.view.phase == UploadPhase::Dragging;
            let accent = ui.visuals().selection.bg_fill;
            let base_fill = ui.visuals().window_fill;
            let card_fill = if highlighted {
                lighten_color(base_fill, 0.04)
            } else {
                base_fill
            };
            let card_stroke = egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            );

            ui.add_space((ui.available_height() * 0.5 - 170.0).max(8.0));
            ui.vertical_centered(|ui| {
                ui.set_max_width(520.0);
                let card = egui::Frame::NONE
                    .fill(card_fill)
                    .stroke(card_stroke)
                    .corner_radius(14.0)
                    .inner_margin(egui::Margin::symmetric(20, 18));
                let card_rect = card
                    .show(ui, |ui| {
                        ui.set_min_width(440.0);
                        if self.view.phase == UploadPhase::Processing {
                            self.show_progress_card(ui);
                        } else if self.view.result.is_some() {
                            self.show_result_card(ui);
                        } else {
                            self.show_drop_zone(ui);
                        }
                    })
                    .response
                    .rect;

                if highlighted {
                    paint_dashed_border(ui.painter(), card_rect.shrink(3.0), accent);
                }

                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    let span = 3.0 * 108.0;
                    ui.add_space((ui.available_width() - span).max(0.0) / 2.0);
                    chip(ui, "Text files");
                    chip(ui, "Data files");
                    chip(ui, "Fast processing");
                });
            });
        });
    }

    fn show_progress_card(&mut self, ui: &mut egui::Ui) {
        let percent = self.view.progress;
        let message = self.view.message;

        ui.vertical_centered(|ui| {
            ui.add_space(6.0);
            let accent = ui.visuals().selection.bg_fill;
            let track = ui.visuals().faint_bg_color;
            let text_color = ui.visuals().strong_text_color();
            let (rect, _) = ui.allocate_exact_size(egui::vec2(96.0, 96.0), egui::Sense::hover());
            paint_progress_ring(ui.painter(), rect, percent, accent, track, text_color);

            ui.add_space(10.0);
            ui.label(egui::RichText::new(message).size(14.0));
            ui.add_space(8.0);
            stage_dots(ui, percent);
            ui.add_space(4.0);
        });
    }

    fn show_result_card(&mut self, ui: &mut egui::Ui) {
        let mut copy_requested = false;
        let mut clear_requested = false;

        if let Some(result) = &self.view.result {
            ui.label(egui::RichText::new("File processed").strong().size(16.0));
            ui.add_space(2.0);
            ui.label(egui::RichText::new(&result.file_name).size(13.0));
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                chip(ui, &result.mime_label);
                chip(ui, &human_readable_bytes(result.size_bytes));
                chip(ui, &format!("{} lines", result.line_count()));
                chip(ui, &format!("loaded {}", result.loaded_at.format("%H:%M:%S")));
            });
            ui.add_space(8.0);

            let truncated = result.content.len() > PREVIEW_CHAR_LIMIT;
            egui::Frame::NONE
                .fill(ui.visuals().extreme_bg_color)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(8, 6))
                .show(ui, |ui| {
                    egui::ScrollArea::vertical()
                        .id_salt("result_preview")
                        .max_height(180.0)
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(preview_text(&result.content))
                                    .monospace()
                                    .size(12.0),
                            );
                        });
                });
            if truncated {
                ui.small("Preview truncated; copying puts the full content on the clipboard.");
            }
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Copy content").clicked() {
                    copy_requested = true;
                }
                if ui.button("Clear").clicked() {
                    clear_requested = true;
                }
            });
        }

        if copy_requested {
            self.copy_result_to_clipboard();
        }
        if clear_requested {
            self.view.result = None;
            self.status = "Ready".to_string();
        }
    }

    fn copy_result_to_clipboard(&mut self) {
        if let Some(result) = &self.view.result {
            match Clipboard::new() {
                Ok(mut clipboard) => match clipboard.set_text(result.content.clone()) {
                    Ok(()) => self.status = "Content copied to clipboard".to_string(),
                    Err(err) => self.status = format!("Clipboard write failed: {err}"),
                },
                Err(err) => self.status = format!("Clipboard unavailable: {err}"),
            }
        }
    }

    fn show_drop_zone(&mut self, ui: &mut egui::Ui) {
        let highlighted = self.view.drag_over || self.view.phase == UploadPhase::Dragging;
        let headline = if highlighted {
            "Release to upload"
        } else {
            "Drop your file here"
        };

        ui.vertical_centered(|ui| {
            ui.add_space(14.0);
            let icon_color = if highlighted {
                ui.visuals().selection.bg_fill
            } else {
                ui.visuals().weak_text_color()
            };
            ui.label(egui::RichText::new("⬆").size(30.0).color(icon_color));
            ui.add_space(6.0);
            ui.label(egui::RichText::new(headline).size(18.0).strong());
            ui.add_space(4.0);
            ui.label(egui::RichText::new("or").weak().size(12.0));
            ui.add_space(6.0);
            if ui
                .add(
                    egui::Button::new(egui::RichText::new("Browse Files").size(14.0))
                        .min_size(egui::vec2(130.0, 34.0)),
                )
                .clicked()
            {
                dispatch_worker_command(&self.cmd_tx, WorkerCommand::PickFile, &mut self.status);
            }
            ui.add_space(14.0);
            ui.horizontal(|ui| {
                let span = ACCEPTED_EXTENSIONS.len() as f32 * 52.0;
                ui.add_space((ui.available_width() - span).max(0.0) / 2.0);
                for ext in ACCEPTED_EXTENSIONS {
                    chip(ui, &ext.to_ascii_uppercase());
                }
            });
            ui.add_space(18.0);
        });
    }

    fn show_failure_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.view.failure.clone() else {
            return;
        };

        let window_frame = egui::Frame::NONE
            .fill(ctx.style().visuals.window_fill)
            .stroke(egui::Stroke::new(
                1.0,
                ctx.style().visuals.window_stroke().color,
            ))
            .corner_radius(egui::CornerRadius::same(10))
            .inner_margin(egui::Margin::symmetric(14, 12));

        let mut keep_open = true;
        let mut dismissed = false;
        egui::Window::new("read_failure_window")
            .title_bar(false)
            .resizable(false)
            .collapsible(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, -40.0))
            .open(&mut keep_open)
            .frame(window_frame)
            .show(ctx, |ui| {
                ui.set_max_width(360.0);
                ui.heading("File could not be read");
                ui.add_space(6.0);
                ui.label(format!("Error reading file: {}", notice.file_name));
                ui.label(egui::RichText::new(&notice.reason).weak().size(12.0));
                ui.add_space(10.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Dismiss").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || !keep_open {
            self.view.failure = None;
        }
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let window_frame = egui::Frame::NONE
            .fill(ctx.style().visuals.window_fill)
            .stroke(egui::Stroke::new(
                1.0,
                ctx.style().visuals.window_stroke().color,
            ))
            .corner_radius(egui::CornerRadius::same(10))
            .inner_margin(egui::Margin::symmetric(12, 10));

        let mut settings_open = self.settings_open;
        let mut close_requested = false;
        let before = self.settings;

        egui::Window::new("settings_window")
            .title_bar(false)
            .frame(window_frame)
            .open(&mut settings_open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("Settings").strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("Close").clicked() {
                            close_requested = true;
                        }
                    });
                });
                ui.separator();

                ui.checkbox(
                    &mut self.settings.particles_enabled,
                    "Ambient background particles",
                );

                if ui.button("Use system theme").clicked() {
                    self.theme.clear_override();
                    self.settings.markers = self.board.markers();
                }

                ui.separator();
                if let Some(paths) = &self.paths {
                    ui.small(format!("Data directory: {}", paths.data_root.display()));
                    ui.small(format!("Settings: {}", paths.settings_path.display()));
                } else {
                    ui.small("Settings are not persisted (no writable data directory)");
                }
            });

        self.settings_open = settings_open && !close_requested;

        if self.settings != before {
            self.persist_settings();
        }
    }
}

fn startup_markers(theme_override: Option<ThemeMarker>, persisted: MarkerSet) -> MarkerSet {
    match theme_override {
        Some(ThemeMarker::Dark) => MarkerSet {
            dark: true,
            light: false,
        },
        Some(ThemeMarker::Light) => MarkerSet {
            dark: false,
            light: true,
        },
        None => persisted,
    }
}

fn dropped_file_ref(file: &egui::DroppedFile) -> Option<FileRef> {
    if let Some(path) = &file.path {
        return Some(FileRef::from_path(path.clone()));
    }
    file.bytes
        .as_ref()
        .map(|bytes| FileRef::from_bytes(file.name.clone(), Arc::clone(bytes)))
}

fn preview_text(content: &str) -> &str {
    if content.len() <= PREVIEW_CHAR_LIMIT {
        return content;
    }
    let mut end = PREVIEW_CHAR_LIMIT;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn chip(ui: &mut egui::Ui, text: &str) {
    let fill = ui.visuals().faint_bg_color;
    let stroke = ui.visuals().widgets.noninteractive.bg_stroke;
    egui::Frame::NONE
        .fill(fill)
        .stroke(stroke)
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(8, 3))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).size(11.0));
        });
}

fn stage_dots(ui: &mut egui::Ui, percent: u8) {
    let active = stage_index(percent);
    let on = ui.visuals().selection.bg_fill;
    let off = ui.visuals().faint_bg_color;
    ui.horizontal(|ui| {
        let span = STAGE_MESSAGES.len() as f32 * 18.0;
        ui.add_space((ui.available_width() - span).max(0.0) / 2.0);
        for stage in 0..STAGE_MESSAGES.len() {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
            let color = if stage <= active { on } else { off };
            ui.painter().circle_filled(rect.center(), 4.0, color);
        }
    });
}

fn paint_progress_ring(
    painter: &egui::Painter,
    rect: egui::Rect,
    percent: u8,
    accent: egui::Color32,
    track: egui::Color32,
    text_color: egui::Color32,
) {
    let center = rect.center();
    let radius = rect.width().min(rect.height()) * 0.5 - 6.0;
    painter.circle_stroke(center, radius, egui::Stroke::new(6.0, track));

    if percent > 0 {
        let sweep = percent as f32 / 100.0 * std::f32::consts::TAU;
        let points: Vec<egui::Pos2> = (0..=64)
            .map(|i| {
                let angle = -std::f32::consts::FRAC_PI_2 + sweep * (i as f32 / 64.0);
                egui::pos2(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(6.0, accent)));
    }

    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        format!("{percent}%"),
        egui::FontId::proportional(20.0),
        text_color,
    );
}

fn paint_dashed_border(painter: &egui::Painter, rect: egui::Rect, color: egui::Color32) {
    let stroke = egui::Stroke::new(1.5, color);
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    for edge in corners.windows(2) {
        painter.extend(egui::Shape::dashed_line(edge, stroke, 6.0, 4.0));
    }
}

fn visuals_for_surface(dark: bool) -> egui::Visuals {
    let accent = if dark {
        egui::Color32::from_rgb(122, 162, 247)
    } else {
        egui::Color32::from_rgb(59, 110, 201)
    };
    let border = if dark {
        egui::Color32::from_rgb(52, 57, 70)
    } else {
        egui::Color32::from_rgb(205, 210, 220)
    };

    let mut visuals = if dark {
        let mut v = egui::Visuals::dark();
        v.override_text_color = Some(egui::Color32::from_rgb(236, 239, 244));
        v.window_fill = egui::Color32::from_rgb(24, 26, 34);
        v.panel_fill = egui::Color32::from_rgb(17, 19, 26);
        v.extreme_bg_color = egui::Color32::from_rgb(12, 13, 18);
        v.faint_bg_color = egui::Color32::from_rgb(35, 38, 48);
        v
    } else {
        let mut v = egui::Visuals::light();
        v.override_text_color = Some(egui::Color32::from_rgb(36, 41, 46));
        v.window_fill = egui::Color32::from_rgb(245, 247, 250);
        v.panel_fill = egui::Color32::from_rgb(238, 241, 245);
        v.extreme_bg_color = egui::Color32::WHITE;
        v.faint_bg_color = egui::Color32::from_rgb(225, 229, 235);
        v
    };

    visuals.hyperlink_color = accent;
    visuals.selection.bg_fill = accent;
    visuals.widgets.active.bg_fill = accent;
    visuals.widgets.hovered.bg_fill = accent.gamma_multiply(0.85);
    visuals.window_stroke = egui::Stroke::new(1.0, border);
    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, border);
    visuals.window_corner_radius = egui::CornerRadius::same(12);
    visuals.menu_corner_radius = egui::CornerRadius::same(10);

    visuals
}

fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

impl eframe::App for GlassdropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.feed_system_scheme(ctx);
        if !self.theme_observed {
            self.theme.observe();
            self.theme_observed = true;
        }

        self.process_ui_events();
        self.apply_theme_if_needed(ctx);

        if !(self.worker_ready && self.theme.is_ready()) {
            self.show_splash(ctx);
            ctx.request_repaint_after(Duration::from_millis(16));
            return;
        }

        self.handle_drag_and_drop(ctx);
        self.show_main_surface(ctx);
        self.show_failure_window(ctx);
        self.show_settings_window(ctx);

        if self.view.phase == UploadPhase::Processing || self.particles_active() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn formats_sizes_readably() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
        assert_eq!(human_readable_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn surface_settings_round_trip_as_json() {
        let settings = SurfaceSettings {
            markers: MarkerSet {
                dark: true,
                light: false,
            },
            particles_enabled: false,
        };
        let text = serde_json::to_string(&settings).expect("serialize");
        let back: SurfaceSettings = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, settings);
    }

    #[test]
    fn missing_settings_fields_fall_back_to_defaults() {
        let back: SurfaceSettings = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(back, SurfaceSettings::default());
        assert!(back.particles_enabled);
    }

    #[test]
    fn app_paths_nest_settings_under_the_data_root() {
        let startup = StartupConfig {
            data_dir: Some(PathBuf::from("/tmp/glassdrop-paths-test")),
            theme_override: None,
            particles_enabled: true,
        };

        let paths = AppPaths::from_startup(&startup).expect("explicit data dir always resolves");
        assert_eq!(paths.data_root, PathBuf::from("/tmp/glassdrop-paths-test"));
        assert_eq!(paths.settings_path, paths.data_root.join("settings.json"));
    }

    #[test]
    fn dropped_files_prefer_paths_over_bytes() {
        let on_disk = egui::DroppedFile {
            path: Some(PathBuf::from("/tmp/report.json")),
            name: "ignored.bin".to_string(),
            ..Default::default()
        };
        let file_ref = dropped_file_ref(&on_disk).expect("file ref");
        assert_eq!(file_ref.name, "report.json");

        let in_memory = egui::DroppedFile {
            name: "pasted.txt".to_string(),
            bytes: Some(Arc::from(b"hello".as_slice())),
            ..Default::default()
        };
        let file_ref = dropped_file_ref(&in_memory).expect("file ref");
        assert_eq!(file_ref.name, "pasted.txt");

        let empty = egui::DroppedFile {
            name: "nothing".to_string(),
            ..Default::default()
        };
        assert!(dropped_file_ref(&empty).is_none());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let content = "\u{20ac}".repeat(PREVIEW_CHAR_LIMIT);
        let preview = preview_text(&content);
        assert!(preview.len() <= PREVIEW_CHAR_LIMIT);
        assert!(!preview.is_empty());
        assert!(content.starts_with(preview));

        let short = "plain text";
        assert_eq!(preview_text(short), short);
    }

    #[test]
    fn theme_override_beats_persisted_markers() {
        let persisted = MarkerSet {
            dark: true,
            light: false,
        };

        let dark = startup_markers(Some(ThemeMarker::Dark), MarkerSet::default());
        assert!(dark.dark && !dark.light);

        let light = startup_markers(Some(ThemeMarker::Light), persisted);
        assert!(!light.dark && light.light);

        assert_eq!(startup_markers(None, persisted), persisted);
    }

    #[test]
    fn bootstrap_wires_theme_sources_into_the_synchronizer() {
        let (cmd_tx, _cmd_rx) = bounded(4);
        let (_ui_tx, ui_rx) = bounded(4);
        let uploader = UploadController::new(|_| {});
        let startup = StartupConfig {
            data_dir: Some(std::env::temp_dir().join("glassdrop-bootstrap-test")),
            theme_override: Some(ThemeMarker::Dark),
            particles_enabled: false,
        };

        let app = GlassdropApp::bootstrap(cmd_tx, ui_rx, uploader, startup);

        let markers = app.board.markers();
        assert!(markers.dark && !markers.light);
        assert!(!app.theme.is_ready());

        app.theme.observe();
        assert!(app.theme.is_ready());
        assert!(app.theme.is_dark());
    }

    #[test]
    fn error_labels_cover_every_context() {
        assert_eq!(err_label(UiErrorContext::WorkerStartup), "Worker startup");
        assert_eq!(err_label(UiErrorContext::Ingest), "Upload");
    }
}
