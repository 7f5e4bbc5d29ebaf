//! Tuus Imago Core Library
//!
//! This library provides the core functionality of the Tuus Imago photo
//! editor: square cropping, visual adjustments, signed uploads to the image
//! CDN and CDN-side previews of AI-style enhancements.
//!
//! # Overview
//!
//! A user picks a photo, crops it to a square, adjusts rotation, flips,
//! brightness, contrast, grayscale and blur, and uploads it. Afterwards the
//! uploaded photo can be previewed with enhancements expressed as CDN URL
//! transformation segments. The library handles:
//!
//! - **URL composition**: Ordered transformation chains via [`preview_url`]
//! - **Cropping**: Pointer and keyboard crop interaction via [`crop`]
//! - **Local preview**: Rotated, mirrored and filtered renders via [`render`]
//! - **Uploading**: Signed multipart uploads with progress via [`upload`]
//! - **User Interface**: The desktop editor via [`ui`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`TuusImago`] facade:
//!
//! ```ignore
//! use tuus_imago_core::TuusImago;
//!
//! // Initialize with environment configuration
//! let app = TuusImago::new()?;
//!
//! // Launch the editor with a photo
//! app.run_editor(Some("photo.jpg".into()))?;
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: Configuration loading and management
//! - [`crop`]: Crop rectangle and its interaction controller
//! - [`error`]: Error types and result aliases
//! - [`i18n`]: User-visible message lookup
//! - [`image_processing`]: Source images and coordinate mapping
//! - [`preview_url`]: CDN transformation URLs
//! - [`render`]: Local transform preview
//! - [`session`]: Editor and preview state machines
//! - [`transform`]: Visual adjustments and AI effect flags
//! - [`ui`]: User interface components
//! - [`upload`]: File validation and signed uploads

pub mod config;
pub mod crop;
pub mod error;
pub mod i18n;
pub mod image_processing;
pub mod preview_url;
pub mod render;
pub mod session;
pub mod transform;
pub mod ui;
pub mod upload;

// Re-export primary types for convenience
pub use config::Config;
pub use crop::{CropArea, CropController};
pub use error::{AppError, Result};
pub use image_processing::{NaturalCrop, SourceImage};
pub use preview_url::{compose_url, CropInstruction, PreviewRequest};
pub use render::{PreviewRenderer, RenderedPreview};
pub use transform::{AiAdjustments, AiEffect, ImageTransformations};
pub use upload::{UploadOutcome, UploadResult, Uploader};

use std::path::{Path, PathBuf};

/// Main entry point for the Tuus Imago editor.
///
/// This struct provides a facade over the various subsystems, handling
/// initialization and orchestration for the CLI and other front ends.
///
/// # Example
///
/// ```ignore
/// use tuus_imago_core::TuusImago;
///
/// let app = TuusImago::new()?;
/// let transforms = ImageTransformations::default();
/// let outcome = app
///     .upload_file("photo.jpg".as_ref(), None, &transforms, |p| println!("{p}%"))
///     .await?;
/// ```
pub struct TuusImago {
    config: Config,
}

impl TuusImago {
    /// Creates a new instance with configuration from the environment
    /// (including `.env` files).
    ///
    /// # Errors
    ///
    /// Returns an error if a configured URL is invalid.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    /// Creates an instance with custom configuration.
    ///
    /// Use this when CLI flags override environment values.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Launches the interactive editor, optionally opening `initial`.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created.
    pub fn run_editor(&self, initial: Option<PathBuf>) -> Result<()> {
        ui::run_editor(self.config.clone(), initial)
    }

    /// Validates and uploads a photo with an optional natural-pixel crop and
    /// the adjustments to record alongside it.
    ///
    /// # Errors
    ///
    /// Returns any validation, configuration, signature or transfer error.
    pub async fn upload_file(
        &self,
        path: &Path,
        crop: Option<NaturalCrop>,
        transforms: &ImageTransformations,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<UploadOutcome> {
        let source = SourceImage::open(path)?;
        Uploader::new(self.config.clone())?
            .upload(source.file(), crop, transforms, on_progress)
            .await
    }

    /// Renders the local preview of `path` with `transforms` and no crop.
    pub fn render_file(&self, path: &Path, transforms: &ImageTransformations) -> Result<RenderedPreview> {
        let source = SourceImage::open(path)?;
        PreviewRenderer::new().render(
            &source,
            CropArea::default(),
            image_processing::DisplayScale::identity(),
            transforms,
        )
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
