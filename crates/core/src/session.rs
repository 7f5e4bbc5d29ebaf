//! Editor and preview state machines.
//!
//! Both sessions are plain data driven by method calls: the egui screens
//! feed them user input and background-task results, and read back what to
//! draw. Nothing here touches the network or the clock directly; time is
//! advanced with explicit `tick` calls.

use crate::crop::{CropArea, CropController};
use crate::error::{AppError, Result};
use crate::i18n;
use crate::image_processing::{DisplayScale, NaturalCrop, SourceImage};
use crate::preview_url::{CropInstruction, PreviewRequest};
use crate::render::PreviewRenderer;
use crate::transform::{AiAdjustments, AiEffect, ImageTransformations};
use crate::upload::{UploadOutcome, ValidatedFile};
use eframe::egui;
use image::RgbaImage;
use std::time::Duration;

/// Crop used when the user continues before a crop was placed.
const FALLBACK_CROP_SIZE: f32 = 400.0;

const SUCCESS_NOTICE_DURATION: Duration = Duration::from_secs(3);
const ERROR_NOTICE_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorStep {
    #[default]
    Select,
    Crop,
    Adjust,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading {
        progress: u8,
    },
    Failed(String),
}

/// Everything the background task needs to perform one upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: ValidatedFile,
    pub crop: Option<NaturalCrop>,
    pub transforms: ImageTransformations,
}

/// Select, crop and adjust a photo, then hand it to the uploader.
#[derive(Debug, Default)]
pub struct EditorSession {
    step: EditorStep,
    source: Option<SourceImage>,
    crop: CropController,
    scale: Option<DisplayScale>,
    transforms: ImageTransformations,
    upload: UploadState,
    error: Option<String>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> EditorStep {
        self.step
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn crop(&self) -> &CropController {
        &self.crop
    }

    pub fn crop_mut(&mut self) -> &mut CropController {
        &mut self.crop
    }

    pub fn transforms(&self) -> &ImageTransformations {
        &self.transforms
    }

    pub fn upload_state(&self) -> &UploadState {
        &self.upload
    }

    /// Last validation or upload error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.upload, UploadState::Uploading { .. })
    }

    /// Loads a new photo and moves to the crop step. The previous photo is
    /// dropped and all edits are forgotten.
    pub fn select_file(&mut self, source: SourceImage) {
        if self.is_busy() {
            log::warn!("Ignoring file selection while an upload is running");
            return;
        }
        log::info!("Selected {}", source.file().name());
        self.reset();
        self.source = Some(source);
        self.step = EditorStep::Crop;
    }

    /// Records a rejected selection. The current state is left untouched.
    pub fn file_rejected(&mut self, error: &AppError) {
        log::warn!("File rejected: {}", error);
        self.error = Some(error.to_string());
    }

    /// The photo was laid out at `bounds` display pixels.
    pub fn image_displayed(&mut self, bounds: egui::Vec2) {
        let Some(source) = &self.source else {
            return;
        };
        self.scale = DisplayScale::new(source.dimensions(), bounds);
        self.crop.set_bounds(bounds);
    }

    /// Moves to the adjust step, falling back to a 400x400 crop at the
    /// origin if none was placed.
    pub fn confirm_crop(&mut self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        if !self.crop.is_ready() {
            let fallback = egui::vec2(FALLBACK_CROP_SIZE, FALLBACK_CROP_SIZE);
            log::debug!("No crop placed, using {}x{} fallback", fallback.x, fallback.y);
            self.scale = DisplayScale::new(source.dimensions(), fallback);
            self.crop.reset();
            self.crop.set_bounds(fallback);
            self.crop.set_area(CropArea::new(0.0, 0.0, fallback.x, fallback.y));
        }
        self.step = EditorStep::Adjust;
        true
    }

    pub fn back_to_crop(&mut self) {
        if self.step == EditorStep::Adjust && !self.is_busy() {
            self.step = EditorStep::Crop;
        }
    }

    pub fn rotate(&mut self, delta: i32) {
        self.transforms.rotate(delta);
    }

    pub fn flip_horizontal(&mut self) {
        self.transforms.toggle_flip_horizontal();
    }

    pub fn flip_vertical(&mut self) {
        self.transforms.toggle_flip_vertical();
    }

    pub fn set_brightness(&mut self, value: i32) {
        self.transforms.set_brightness(value);
    }

    pub fn set_contrast(&mut self, value: i32) {
        self.transforms.set_contrast(value);
    }

    pub fn set_grayscale(&mut self, value: i32) {
        self.transforms.set_grayscale(value);
    }

    pub fn set_blur(&mut self, value: f32) {
        self.transforms.set_blur(value);
    }

    pub fn reset_transforms(&mut self) {
        self.transforms = ImageTransformations::default();
    }

    /// Drops the photo and every edit.
    pub fn cancel(&mut self) {
        if self.is_busy() {
            return;
        }
        self.reset();
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// The current crop in natural pixels, once it can be derived.
    pub fn natural_crop(&self) -> Option<NaturalCrop> {
        NaturalCrop::from_display(self.crop.area(), self.scale?)
    }

    /// Renders the local preview of the current crop and transforms.
    pub fn render_preview(&self, renderer: &PreviewRenderer) -> Result<RgbaImage> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| AppError::ui("No photo selected"))?;
        renderer.render_surface(
            source,
            self.crop.area(),
            self.scale.unwrap_or_else(DisplayScale::identity),
            &self.transforms,
        )
    }

    /// Marks the upload as running and returns what to send.
    pub fn upload_started(&mut self) -> Option<UploadRequest> {
        if self.is_busy() || self.step != EditorStep::Adjust {
            return None;
        }
        let file = self.source.as_ref()?.file().clone();
        self.upload = UploadState::Uploading { progress: 0 };
        self.error = None;
        Some(UploadRequest {
            file,
            crop: self.natural_crop(),
            transforms: self.transforms,
        })
    }

    pub fn upload_progress(&mut self, percent: u8) {
        if let UploadState::Uploading { progress } = &mut self.upload {
            *progress = (*progress).max(percent.min(100));
        }
    }

    /// Finishes the running upload. Success clears the whole session and
    /// returns the outcome; failure keeps the edits so the user can retry.
    pub fn upload_finished(&mut self, result: Result<UploadOutcome>) -> Option<UploadOutcome> {
        match result {
            Ok(outcome) => {
                self.reset();
                Some(outcome)
            }
            Err(e) => {
                log::error!("Upload failed: {}", e);
                let message = e.to_string();
                self.upload = UploadState::Failed(message.clone());
                self.error = Some(message);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewMode {
    #[default]
    Enhanced,
    Original,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    #[default]
    Manual,
    Auto,
}

/// Why the preview is reloading; selects the simulated progress curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReason {
    Preview,
    Crop,
}

impl LoadReason {
    /// `(step, interval, cap)` of the progress ramp.
    fn ramp(self) -> (u8, Duration, u8) {
        match self {
            LoadReason::Preview => (4, Duration::from_millis(130), 90),
            LoadReason::Crop => (8, Duration::from_millis(90), 95),
        }
    }

    fn label_key(self) -> &'static str {
        match self {
            LoadReason::Preview => "upload.previewLoading",
            LoadReason::Crop => "upload.cropLoading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loading {
    pub reason: LoadReason,
    pub progress: u8,
    elapsed: Duration,
}

impl Loading {
    fn new(reason: LoadReason) -> Self {
        Self {
            reason,
            progress: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn tick(&mut self, dt: Duration) {
        let (step, interval, cap) = self.reason.ramp();
        self.elapsed += dt;
        while self.elapsed >= interval {
            self.elapsed -= interval;
            self.progress = self.progress.saturating_add(step).min(cap);
        }
    }

    pub fn label(&self) -> String {
        i18n::t_with(self.reason.label_key(), &[("progress", self.progress.to_string())])
    }
}

/// A URL the UI should fetch, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLoad {
    pub generation: u64,
    pub url: String,
}

/// Review of an uploaded photo with CDN-side crop and AI effects.
#[derive(Debug)]
pub struct PreviewSession {
    outcome: UploadOutcome,
    mode: PreviewMode,
    crop_mode: CropMode,
    ai: AiAdjustments,
    ai_preset: Option<String>,
    applied_crop: Option<NaturalCrop>,
    crop: CropController,
    display: egui::Vec2,
    generation: u64,
    loading: Option<Loading>,
    warning: Option<String>,
}

impl PreviewSession {
    pub fn new(outcome: UploadOutcome, ai_preset: Option<String>) -> Self {
        Self {
            outcome,
            mode: PreviewMode::Enhanced,
            crop_mode: CropMode::Manual,
            ai: AiAdjustments::default(),
            ai_preset: ai_preset.filter(|p| !p.trim().is_empty()),
            applied_crop: None,
            crop: CropController::new(),
            display: egui::Vec2::ZERO,
            generation: 0,
            loading: None,
            warning: None,
        }
    }

    pub fn outcome(&self) -> &UploadOutcome {
        &self.outcome
    }

    pub fn mode(&self) -> PreviewMode {
        self.mode
    }

    pub fn crop_mode(&self) -> CropMode {
        self.crop_mode
    }

    pub fn ai(&self) -> &AiAdjustments {
        &self.ai
    }

    pub fn crop(&self) -> &CropController {
        &self.crop
    }

    pub fn crop_mut(&mut self) -> &mut CropController {
        &mut self.crop
    }

    pub fn loading(&self) -> Option<&Loading> {
        self.loading.as_ref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn dismiss_warning(&mut self) {
        self.warning = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the crop overlay is interactive.
    pub fn crop_editable(&self) -> bool {
        self.mode == PreviewMode::Enhanced && self.crop_mode == CropMode::Manual
    }

    /// Crop tuple sent to the CDN: the applied manual crop, else the one
    /// recorded at upload time. Auto mode has none.
    pub fn effective_crop(&self) -> Option<String> {
        if self.crop_mode == CropMode::Auto {
            return None;
        }
        self.applied_crop
            .map(|c| c.to_string())
            .or_else(|| self.outcome.result.custom_coordinates.clone())
    }

    /// The URL the preview should currently show.
    pub fn current_url(&self) -> String {
        let secure_url = &self.outcome.result.secure_url;
        if self.mode == PreviewMode::Original {
            return secure_url.clone();
        }

        let coords = self.effective_crop();
        let crop = match (self.crop_mode, coords.as_deref()) {
            (CropMode::Auto, _) => CropInstruction::Auto,
            (CropMode::Manual, Some(coords)) => CropInstruction::Manual(coords),
            (CropMode::Manual, None) => CropInstruction::None,
        };
        PreviewRequest::new()
            .with_transforms(&self.outcome.transforms)
            .with_crop(crop)
            .with_ai(&self.ai)
            .with_ai_preset(self.ai_preset.as_deref())
            .compose(secure_url)
    }

    /// First fetch after the upload finished.
    pub fn initial_load(&mut self) -> PreviewLoad {
        self.start_load(Some(LoadReason::Preview))
    }

    fn start_load(&mut self, reason: Option<LoadReason>) -> PreviewLoad {
        self.generation += 1;
        self.loading = reason.map(Loading::new);
        self.warning = None;
        PreviewLoad {
            generation: self.generation,
            url: self.current_url(),
        }
    }

    pub fn set_mode(&mut self, mode: PreviewMode) -> Option<PreviewLoad> {
        if mode == self.mode {
            return None;
        }
        self.mode = mode;
        match mode {
            PreviewMode::Enhanced => Some(self.start_load(Some(LoadReason::Preview))),
            // The original is shown without a progress indicator.
            PreviewMode::Original => Some(self.start_load(None)),
        }
    }

    pub fn set_crop_mode(&mut self, mode: CropMode) -> Option<PreviewLoad> {
        if mode == self.crop_mode {
            return None;
        }
        self.crop_mode = mode;
        (self.mode == PreviewMode::Enhanced).then(|| self.start_load(Some(LoadReason::Preview)))
    }

    pub fn toggle_ai(&mut self, effect: AiEffect) -> Option<PreviewLoad> {
        self.ai.toggle(effect);
        (self.mode == PreviewMode::Enhanced).then(|| self.start_load(Some(LoadReason::Preview)))
    }

    /// Converts the on-screen crop into resource pixels and reloads.
    pub fn apply_manual_crop(&mut self) -> Option<PreviewLoad> {
        if !self.crop_editable() {
            return None;
        }
        let info = &self.outcome.result;
        let crop = NaturalCrop::from_preview(self.crop.area(), self.display, (info.width, info.height))?;
        log::info!("Applying preview crop {}", crop);
        self.applied_crop = Some(crop);
        Some(self.start_load(Some(LoadReason::Crop)))
    }

    /// Advances the simulated progress.
    pub fn tick(&mut self, dt: Duration) {
        if let Some(loading) = &mut self.loading {
            loading.tick(dt);
        }
    }

    /// A fetch completed and its image is displayed at `display`. Returns
    /// `false` if the result belongs to a superseded request.
    pub fn load_finished(&mut self, generation: u64, display: egui::Vec2) -> bool {
        if generation != self.generation {
            log::debug!("Dropping stale preview result {} (current {})", generation, self.generation);
            return false;
        }
        self.loading = None;
        self.warning = None;
        self.display_resized(display);
        true
    }

    /// The displayed size of the preview image changed.
    pub fn display_resized(&mut self, display: egui::Vec2) {
        self.display = display;
        self.crop.set_bounds(display);
    }

    /// A fetch failed. Only the enhanced view surfaces a warning.
    pub fn load_failed(&mut self, generation: u64, error: &AppError) -> bool {
        if generation != self.generation {
            return false;
        }
        log::warn!("Preview load failed: {}", error);
        self.loading = None;
        if self.mode == PreviewMode::Enhanced {
            self.warning = Some(i18n::t("upload.aiPreviewError"));
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error(String),
}

/// Transient banner shown after an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNotice {
    kind: NoticeKind,
    remaining: Duration,
}

impl UploadNotice {
    pub fn success() -> Self {
        Self {
            kind: NoticeKind::Success,
            remaining: SUCCESS_NOTICE_DURATION,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error(message.into()),
            remaining: ERROR_NOTICE_DURATION,
        }
    }

    pub fn kind(&self) -> &NoticeKind {
        &self.kind
    }

    pub fn message(&self) -> String {
        match &self.kind {
            NoticeKind::Success => i18n::t("upload.success"),
            NoticeKind::Error(message) => message.clone(),
        }
    }

    /// Counts down; returns `false` once the notice should disappear.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        !self.remaining.is_zero()
    }
}
