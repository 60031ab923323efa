//! UI layer for the desktop shell: app surface and ambient background.

pub mod app;
pub mod particles;

pub use app::{GlassdropApp, StartupConfig};
