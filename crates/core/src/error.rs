//! Error types for the tuus-imago-core library.
//!
//! Variants follow the failure taxonomy of the editor: validation errors are
//! raised before any state change, configuration and signature errors block an
//! upload entirely, network errors are reported without retry, and preview
//! load errors are non-fatal warnings.

use thiserror::Error;

/// Errors that can occur within the tuus-imago-core library.
///
/// The `Display` text of every variant is the message shown to the user, so
/// variants wrap the final human-readable string rather than prefixing it.
#[derive(Error, Debug)]
pub enum AppError {
    /// The selected file was rejected (type or size).
    #[error("{0}")]
    Validation(String),

    /// Configuration-related errors (missing keys, invalid values).
    #[error("{0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// The signature endpoint refused or failed to sign the upload.
    #[error("{0}")]
    Signature(String),

    /// Transport-level failure talking to the signer or the CDN.
    #[error("{0}")]
    Network(String),

    /// The upload exceeded its time budget.
    #[error("Upload timed out. Please check your connection and try again.")]
    Timeout,

    /// The CDN answered, but rejected the upload.
    #[error("{0}")]
    UploadRejected(String),

    /// Image decoding, rendering or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// A transformed preview could not be fetched or decoded.
    #[error("Preview could not be loaded: {0}")]
    PreviewLoad(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a signature error with the given message.
    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    /// Returns true for errors that only affect the preview, never the
    /// uploaded image.
    pub fn is_preview_only(&self) -> bool {
        matches!(self, Self::PreviewLoad(_))
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
