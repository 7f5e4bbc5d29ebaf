//! Screen and event types shared by the editor window.

use crate::error::AppError;
use crate::upload::UploadOutcome;
use eframe::egui;

/// Which top-level screen the window shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Select, crop and adjust (see [`crate::session::EditorStep`]).
    Editor,
    /// Reviewing an uploaded photo.
    Preview,
}

/// Events sent from the background upload task to the UI thread.
pub(crate) enum UploadEvent {
    /// Bytes sent so far, in percent.
    Progress(u8),
    /// The upload finished or failed.
    Finished(Result<UploadOutcome, AppError>),
}

/// Events sent from a background preview fetch.
///
/// Both variants carry the generation of the request that produced them so
/// superseded results can be dropped.
pub(crate) enum PreviewEvent {
    Loaded {
        generation: u64,
        image: egui::ColorImage,
    },
    Failed {
        generation: u64,
        error: AppError,
    },
}
