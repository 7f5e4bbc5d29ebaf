//! User interface for tuus-imago.
//!
//! This module provides the desktop photo editor: file selection, square
//! cropping, visual adjustments, signed upload and the CDN preview.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: Screen and background event definitions
//! - [`settings`]: User preferences and persistence
//! - [`rendering`]: Drawing utilities for the crop overlay
//! - [`selection`]: Pointer and keyboard handling for the crop
//! - [`editor`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! use tuus_imago_core::ui;
//! use tuus_imago_core::Config;
//!
//! let config = Config::load()?;
//! ui::run_editor(config, Some("photo.jpg".into()))?;
//! ```

mod editor;
mod rendering;
mod selection;
mod settings;
mod state;

// Public API exports
pub use editor::EditorApp;
pub use rendering::fit_size;
pub use settings::Settings;
pub use state::Screen;

use crate::config::Config;
use crate::error::Result;
use std::path::PathBuf;

/// Opens the editor window and blocks until it is closed.
///
/// # Arguments
/// * `config` - Application configuration with CDN and signer settings
/// * `initial` - Optional photo to open on start
///
/// # Errors
/// Returns [`crate::AppError::Ui`] if the window cannot be created.
pub fn run_editor(config: Config, initial: Option<PathBuf>) -> Result<()> {
    editor::run(config, initial)
}
