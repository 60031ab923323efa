//! Upload worker: a dedicated thread owning the tokio runtime that drives
//! upload sessions and the native file picker.

pub mod commands;
pub mod runtime;
