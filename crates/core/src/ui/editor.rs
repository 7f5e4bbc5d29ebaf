//! Main editor application.
//!
//! `EditorApp` implements `eframe::App` for the photo editor window. The
//! pure state lives in [`EditorSession`] and [`PreviewSession`]; this module
//! draws it, turns clicks into session calls and runs network work on
//! background threads.

use super::rendering::{draw_crop_frame, draw_crop_shade, fit_size};
use super::selection::{hover_cursor, process_keys, process_pointer};
use super::settings::Settings;
use super::state::{PreviewEvent, Screen, UploadEvent};
use crate::config::Config;
use crate::crop::{CropArea, CropController};
use crate::error::{AppError, Result};
use crate::i18n::{t, t_with};
use crate::image_processing::SourceImage;
use crate::render::PreviewRenderer;
use crate::session::{
    CropMode, EditorSession, EditorStep, NoticeKind, PreviewLoad, PreviewMode, PreviewSession,
    UploadNotice, UploadRequest, UploadState,
};
use crate::transform::{
    AiEffect, ImageTransformations, BLUR_RANGE, BRIGHTNESS_RANGE, CONTRAST_RANGE, GRAYSCALE_RANGE,
};
use crate::upload::{UploadOutcome, Uploader};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Darkness of the area outside the crop.
const SHADE_ALPHA: u8 = 150;
/// Vertical space kept free below images for buttons.
const CONTROLS_HEIGHT: f32 = 110.0;
/// Width of the adjustment controls column.
const ADJUST_PANEL_WIDTH: f32 = 260.0;

/// Locally rendered adjust-step preview and the inputs it was made from.
struct RenderedTexture {
    transforms: ImageTransformations,
    crop: CropArea,
    texture: Option<egui::TextureHandle>,
}

/// The photo editor window.
pub struct EditorApp {
    config: Config,
    settings: Settings,
    show_settings: bool,

    session: EditorSession,
    preview: Option<PreviewSession>,
    notice: Option<UploadNotice>,
    renderer: PreviewRenderer,
    path_input: String,

    // Textures
    source_texture: Option<egui::TextureHandle>,
    rendered: Option<RenderedTexture>,
    preview_texture: Option<egui::TextureHandle>,
    /// Generation whose image arrived and still needs its display size.
    pending_finish: Option<u64>,

    // Background work
    upload_tx: Sender<UploadEvent>,
    upload_rx: Receiver<UploadEvent>,
    preview_tx: Sender<PreviewEvent>,
    preview_rx: Receiver<PreviewEvent>,
}

impl EditorApp {
    /// Creates the editor, optionally opening `initial` right away.
    pub fn new(config: Config, initial: Option<PathBuf>) -> Self {
        let (upload_tx, upload_rx) = channel();
        let (preview_tx, preview_rx) = channel();

        if let Some(problem) = config.upload_config_error() {
            log::warn!("Uploads are disabled: {}", problem);
        }

        let mut app = Self {
            config,
            settings: Settings::load(),
            show_settings: false,
            session: EditorSession::new(),
            preview: None,
            notice: None,
            renderer: PreviewRenderer::new(),
            path_input: String::new(),
            source_texture: None,
            rendered: None,
            preview_texture: None,
            pending_finish: None,
            upload_tx,
            upload_rx,
            preview_tx,
            preview_rx,
        };

        if let Some(path) = initial {
            app.path_input = path.display().to_string();
            app.open_path(&path);
        }
        app
    }

    fn screen(&self) -> Screen {
        if self.preview.is_some() {
            Screen::Preview
        } else {
            Screen::Editor
        }
    }

    fn open_path(&mut self, path: &Path) {
        match SourceImage::open(path) {
            Ok(source) => self.load_source(source),
            Err(e) => self.session.file_rejected(&e),
        }
    }

    fn open_bytes(&mut self, name: String, bytes: Vec<u8>) {
        match SourceImage::from_bytes(name, bytes) {
            Ok(source) => self.load_source(source),
            Err(e) => self.session.file_rejected(&e),
        }
    }

    fn load_source(&mut self, source: SourceImage) {
        if self.session.is_busy() {
            return;
        }
        self.leave_preview();
        self.session.select_file(source);
        self.source_texture = None;
        self.rendered = None;
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = &file.path {
            self.open_path(path);
        } else if let Some(bytes) = &file.bytes {
            self.open_bytes(file.name.clone(), bytes.to_vec());
        }
    }

    /// Uploads the photo's texture on the first frame after it was selected.
    fn ensure_source_texture(&mut self, ctx: &egui::Context) {
        match self.session.source() {
            Some(source) if self.source_texture.is_none() => {
                self.source_texture =
                    Some(ctx.load_texture("source", source.to_color_image(), egui::TextureOptions::LINEAR));
            }
            None => self.source_texture = None,
            _ => {}
        }
    }

    /// Spawns the upload on a background thread.
    fn start_upload(&mut self, ctx: &egui::Context) {
        let Some(request) = self.session.upload_started() else {
            return;
        };

        let tx = self.upload_tx.clone();
        let config = self.config.clone();
        let ctx = ctx.clone();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();

            let result = match runtime {
                Ok(rt) => rt.block_on(upload_in_background(config, request, tx.clone(), ctx.clone())),
                Err(e) => Err(AppError::ui(format!("Failed to create async runtime: {}", e))),
            };
            let _ = tx.send(UploadEvent::Finished(result));
            ctx.request_repaint();
        });
    }

    /// Spawns a fetch of `load.url` on a background thread.
    fn fetch_preview(&self, load: PreviewLoad, ctx: &egui::Context) {
        log::debug!("Fetching preview {} (generation {})", load.url, load.generation);
        let tx = self.preview_tx.clone();
        let ctx = ctx.clone();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();

            let result = match runtime {
                Ok(rt) => rt.block_on(fetch_image(&load.url)),
                Err(e) => Err(AppError::ui(format!("Failed to create async runtime: {}", e))),
            };
            let event = match result {
                Ok(image) => PreviewEvent::Loaded {
                    generation: load.generation,
                    image,
                },
                Err(error) => PreviewEvent::Failed {
                    generation: load.generation,
                    error,
                },
            };
            let _ = tx.send(event);
            ctx.request_repaint();
        });
    }

    /// Processes upload events from the background thread.
    fn process_upload_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.upload_rx.try_recv() {
            match event {
                UploadEvent::Progress(percent) => self.session.upload_progress(percent),
                UploadEvent::Finished(result) => {
                    let failure = result.as_ref().err().map(ToString::to_string);
                    match self.session.upload_finished(result) {
                        Some(outcome) => {
                            self.source_texture = None;
                            self.rendered = None;
                            self.notice = Some(UploadNotice::success());
                            self.open_preview(outcome, ctx);
                        }
                        None => {
                            if let Some(message) = failure {
                                self.notice = Some(UploadNotice::error(message));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Processes preview fetch results, dropping superseded ones.
    fn process_preview_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.preview_rx.try_recv() {
            let Some(preview) = &mut self.preview else {
                continue;
            };
            match event {
                PreviewEvent::Loaded { generation, image } => {
                    if generation != preview.generation() {
                        log::debug!("Ignoring stale preview image {}", generation);
                        continue;
                    }
                    self.preview_texture =
                        Some(ctx.load_texture("preview", image, egui::TextureOptions::LINEAR));
                    self.pending_finish = Some(generation);
                }
                PreviewEvent::Failed { generation, error } => {
                    preview.load_failed(generation, &error);
                }
            }
        }
    }

    fn open_preview(&mut self, outcome: UploadOutcome, ctx: &egui::Context) {
        let preset = self
            .settings
            .effective_ai_template(self.config.ai_template.as_deref());
        let mut preview = PreviewSession::new(outcome, preset);
        let load = preview.initial_load();
        self.preview = Some(preview);
        self.preview_texture = None;
        self.pending_finish = None;
        self.fetch_preview(load, ctx);
    }

    fn leave_preview(&mut self) {
        self.preview = None;
        self.preview_texture = None;
        self.pending_finish = None;
    }

    fn tick(&mut self, ctx: &egui::Context, dt: Duration) {
        if let Some(notice) = &mut self.notice {
            if notice.tick(dt) {
                ctx.request_repaint_after(Duration::from_millis(100));
            } else {
                self.notice = None;
            }
        }
        if let Some(preview) = &mut self.preview {
            preview.tick(dt);
            if preview.loading().is_some() {
                ctx.request_repaint_after(Duration::from_millis(50));
            }
        }
    }

    /// Re-renders the adjust-step preview when its inputs changed.
    fn refresh_rendered(&mut self, ctx: &egui::Context) {
        let transforms = *self.session.transforms();
        let crop = self.session.crop().area();
        if matches!(&self.rendered, Some(r) if r.transforms == transforms && r.crop == crop) {
            return;
        }

        let previous = self.rendered.take().and_then(|r| r.texture);
        let texture = match self.session.render_preview(&self.renderer) {
            Ok(surface) => {
                let size = [surface.width() as usize, surface.height() as usize];
                let image = egui::ColorImage::from_rgba_unmultiplied(size, surface.as_raw());
                match previous {
                    Some(mut texture) => {
                        texture.set(image, egui::TextureOptions::LINEAR);
                        Some(texture)
                    }
                    None => Some(ctx.load_texture("adjusted", image, egui::TextureOptions::LINEAR)),
                }
            }
            Err(e) => {
                log::error!("Failed to render preview: {}", e);
                previous
            }
        };
        self.rendered = Some(RenderedTexture {
            transforms,
            crop,
            texture,
        });
    }

    fn render_notice(&self, ui: &mut egui::Ui) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.kind() {
            NoticeKind::Success => egui::Color32::from_rgb(80, 200, 120),
            NoticeKind::Error(_) => egui::Color32::from_rgb(230, 90, 90),
        };
        ui.label(egui::RichText::new(notice.message()).color(color).strong());
    }

    fn render_error(&self, ui: &mut egui::Ui) {
        if let Some(error) = self.session.error() {
            ui.label(egui::RichText::new(error).color(egui::Color32::from_rgb(230, 90, 90)));
        }
    }

    /// Renders the file selection screen.
    fn render_select(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading(t("uploader.title"));
            ui.add_space(8.0);

            let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
            ui.label(if hovering {
                t("upload.dropFile")
            } else {
                t("upload.clickToUpload")
            });
            ui.label(egui::RichText::new(t("upload.fileSupport")).small().weak());
            ui.add_space(12.0);

            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.path_input)
                        .hint_text(t("uploader.pathHint"))
                        .desired_width(360.0),
                );
                let enter_pressed =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button(t("uploader.open")).clicked() || enter_pressed {
                    let path = PathBuf::from(self.path_input.trim());
                    self.open_path(&path);
                }
            });

            self.render_error(ui);
        });
    }

    /// Renders the crop step.
    fn render_crop(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = self.source_texture.clone() else {
            ui.spinner();
            return;
        };

        let available = ui.available_size() - egui::vec2(0.0, CONTROLS_HEIGHT);
        let size = fit_size(texture.size(), available);

        ui.vertical_centered(|ui| {
            let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
            ui.painter()
                .image(texture.id(), rect, full_uv(), egui::Color32::WHITE);

            if self.session.crop().bounds() != size {
                self.session.image_displayed(size);
            }
            crop_overlay(ui, &response, rect, self.session.crop_mut());
        });

        ui.add_space(8.0);
        ui.label(t("upload.cropHint"));
        ui.label(egui::RichText::new(t("upload.cropAreaDescription")).small().weak());
        let announcement = self.session.crop().announcement();
        if !announcement.is_empty() {
            ui.label(egui::RichText::new(announcement).small());
        }
        self.render_error(ui);

        ui.horizontal(|ui| {
            if ui.button(t("uploader.cancel")).clicked() {
                self.session.cancel();
            }
            if ui.button(t("uploader.confirmCrop")).clicked() {
                self.session.confirm_crop();
            }
        });
    }

    /// Renders the adjust step: local preview on the left, controls on the
    /// right.
    fn render_adjust(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        self.refresh_rendered(&ctx);

        ui.horizontal_top(|ui| {
            let available = ui.available_size() - egui::vec2(ADJUST_PANEL_WIDTH, 0.0);
            match self.rendered.as_ref().and_then(|r| r.texture.as_ref()) {
                Some(texture) => {
                    let size = fit_size(texture.size(), available);
                    ui.image((texture.id(), size));
                }
                None => {
                    ui.spinner();
                }
            }

            ui.vertical(|ui| {
                ui.set_width(ADJUST_PANEL_WIDTH);
                self.render_adjust_controls(ui, &ctx);
            });
        });
    }

    fn render_adjust_controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let busy = self.session.is_busy();
        ui.heading(t("uploader.adjustments"));

        ui.add_enabled_ui(!busy, |ui| {
            ui.horizontal(|ui| {
                if ui.button(t("uploader.rotateLeft")).clicked() {
                    self.session.rotate(-90);
                }
                if ui.button(t("uploader.rotateRight")).clicked() {
                    self.session.rotate(90);
                }
            });
            ui.horizontal(|ui| {
                if ui.button(t("uploader.flipHorizontal")).clicked() {
                    self.session.flip_horizontal();
                }
                if ui.button(t("uploader.flipVertical")).clicked() {
                    self.session.flip_vertical();
                }
            });

            let current = *self.session.transforms();

            let mut brightness = current.brightness;
            if ui
                .add(egui::Slider::new(&mut brightness, BRIGHTNESS_RANGE.0..=BRIGHTNESS_RANGE.1).text(t("uploader.brightness")))
                .changed()
            {
                self.session.set_brightness(brightness);
            }

            let mut contrast = current.contrast;
            if ui
                .add(egui::Slider::new(&mut contrast, CONTRAST_RANGE.0..=CONTRAST_RANGE.1).text(t("uploader.contrast")))
                .changed()
            {
                self.session.set_contrast(contrast);
            }

            let mut grayscale = current.grayscale;
            if ui
                .add(egui::Slider::new(&mut grayscale, GRAYSCALE_RANGE.0..=GRAYSCALE_RANGE.1).text(t("uploader.grayscale")))
                .changed()
            {
                self.session.set_grayscale(grayscale);
            }

            let mut blur = current.blur;
            if ui
                .add(
                    egui::Slider::new(&mut blur, BLUR_RANGE.0..=BLUR_RANGE.1)
                        .step_by(0.1)
                        .text(t("uploader.blur")),
                )
                .changed()
            {
                self.session.set_blur(blur);
            }

            if ui.button(t("uploader.reset")).clicked() {
                self.session.reset_transforms();
            }
        });

        ui.separator();

        match self.session.upload_state() {
            UploadState::Uploading { progress } => {
                let label = t_with("uploader.uploadingProgress", &[("progress", progress.to_string())]);
                ui.add(egui::ProgressBar::new(*progress as f32 / 100.0).text(label));
            }
            UploadState::Failed(_) => self.render_error(ui),
            UploadState::Idle => {}
        }

        let config_problem = self.config.upload_config_error();
        if let Some(problem) = &config_problem {
            ui.label(egui::RichText::new(problem).small().color(egui::Color32::YELLOW));
        }

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new(t("uploader.backToCrop")))
                .clicked()
            {
                self.session.back_to_crop();
            }
            if ui
                .add_enabled(!busy, egui::Button::new(t("uploader.cancel")))
                .clicked()
            {
                self.session.cancel();
            }
            if ui
                .add_enabled(!busy && config_problem.is_none(), egui::Button::new(t("uploader.upload")))
                .clicked()
            {
                self.start_upload(ctx);
            }
        });
    }

    /// Renders the review screen of an uploaded photo.
    fn render_preview_screen(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let mut loads: Vec<PreviewLoad> = Vec::new();
        let mut leave = false;

        ui.horizontal(|ui| {
            ui.label(t("upload.previewModeTitle"));
            if ui
                .selectable_label(preview.mode() == PreviewMode::Enhanced, t("upload.previewYourImage"))
                .clicked()
            {
                loads.extend(preview.set_mode(PreviewMode::Enhanced));
            }
            if ui
                .selectable_label(preview.mode() == PreviewMode::Original, t("upload.previewOriginalTab"))
                .clicked()
            {
                loads.extend(preview.set_mode(PreviewMode::Original));
            }
        });

        if preview.mode() == PreviewMode::Enhanced {
            ui.horizontal(|ui| {
                ui.label(t("upload.cropModeTitle"));
                if ui
                    .selectable_label(preview.crop_mode() == CropMode::Manual, t("upload.cropManual"))
                    .clicked()
                {
                    loads.extend(preview.set_crop_mode(CropMode::Manual));
                }
                if ui
                    .selectable_label(preview.crop_mode() == CropMode::Auto, t("upload.cropAuto"))
                    .clicked()
                {
                    loads.extend(preview.set_crop_mode(CropMode::Auto));
                }
            });

            ui.horizontal_wrapped(|ui| {
                for effect in AiEffect::ALL {
                    if ui
                        .selectable_label(preview.ai().get(effect), t(effect.label_key()))
                        .clicked()
                    {
                        loads.extend(preview.toggle_ai(effect));
                    }
                }
            });
            let count = preview.ai().active_count().to_string();
            ui.label(egui::RichText::new(t_with("upload.previewAiActive", &[("count", count)])).small());
        }

        if let Some(loading) = preview.loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(loading.label());
            });
            ui.add(egui::ProgressBar::new(loading.progress as f32 / 100.0));
        }

        if let Some(warning) = preview.warning().map(str::to_string) {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(warning).color(egui::Color32::YELLOW));
                if ui.small_button("✕").clicked() {
                    preview.dismiss_warning();
                }
            });
        }

        if let Some(texture) = self.preview_texture.clone() {
            let available = ui.available_size() - egui::vec2(0.0, CONTROLS_HEIGHT);
            let size = fit_size(texture.size(), available);

            ui.vertical_centered(|ui| {
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
                ui.painter()
                    .image(texture.id(), rect, full_uv(), egui::Color32::WHITE);

                if let Some(generation) = self.pending_finish.take() {
                    preview.load_finished(generation, size);
                } else if preview.crop().bounds() != size {
                    preview.display_resized(size);
                }

                if preview.crop_editable() && preview.loading().is_none() {
                    crop_overlay(ui, &response, rect, preview.crop_mut());
                }
            });

            let announcement = preview.crop().announcement();
            if preview.crop_editable() && !announcement.is_empty() {
                ui.label(egui::RichText::new(announcement).small());
            }
        } else if preview.loading().is_none() {
            ui.label(t("upload.uploadedPhoto"));
        }

        ui.horizontal(|ui| {
            if preview.crop_editable() && ui.button(t("upload.applyCrop")).clicked() {
                loads.extend(preview.apply_manual_crop());
            }
            if ui.button(t("upload.openPreviewUrl")).clicked() {
                copy_to_clipboard(&preview.current_url());
            }
            if ui.button(t("upload.uploadAnother")).clicked() {
                leave = true;
            }
        });

        for load in loads {
            self.fetch_preview(load, &ctx);
        }
        if leave {
            self.leave_preview();
        }
    }

    fn render_debug_panel(&self, ctx: &egui::Context) {
        egui::SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Debug");
                ui.separator();
                match &self.preview {
                    Some(preview) => {
                        ui.label(format!("generation: {}", preview.generation()));
                        ui.label(format!(
                            "crop: {}",
                            preview.effective_crop().unwrap_or_else(|| "-".to_string())
                        ));
                        ui.label(format!("public id: {}", preview.outcome().result.public_id));
                        ui.label(egui::RichText::new(preview.current_url()).monospace().small());
                    }
                    None => {
                        ui.label(format!("step: {:?}", self.session.step()));
                        ui.label(format!("crop: {:?}", self.session.crop().area()));
                        ui.label(format!(
                            "natural crop: {}",
                            self.session
                                .natural_crop()
                                .map(|c| c.to_string())
                                .unwrap_or_else(|| "-".to_string())
                        ));
                        ui.label(
                            egui::RichText::new(self.session.transforms().context().to_string())
                                .monospace()
                                .small(),
                        );
                    }
                }
            });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("AI template");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings.ai_template)
                        .hint_text(self.config.ai_template.as_deref().unwrap_or("none")),
                );
                ui.checkbox(&mut self.settings.show_debug_panel, "Show debug panel");
                if ui.button("Save").clicked() {
                    if let Err(e) = self.settings.save() {
                        log::warn!("Failed to save settings: {}", e);
                    }
                }
            });
        self.show_settings = open;
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = Duration::from_secs_f32(ctx.input(|i| i.stable_dt).clamp(0.0, 1.0));

        self.process_upload_events(ctx);
        self.process_preview_events(ctx);
        self.tick(ctx, dt);
        if !self.session.is_busy() {
            self.handle_dropped_files(ctx);
        }
        self.ensure_source_texture(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Tuus Imago");
                let step = match (self.screen(), self.session.step()) {
                    (Screen::Preview, _) => Some(t("upload.previewModeTitle")),
                    (_, EditorStep::Crop) => Some(t("uploader.cropStep")),
                    (_, EditorStep::Adjust) => Some(t("uploader.adjustStep")),
                    (_, EditorStep::Select) => None,
                };
                if let Some(step) = step {
                    ui.label(egui::RichText::new(step).weak());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                });
            });
            self.render_notice(ui);
        });

        if self.settings.show_debug_panel {
            self.render_debug_panel(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| match self.screen() {
            Screen::Preview => self.render_preview_screen(ui),
            Screen::Editor => match self.session.step() {
                EditorStep::Select => self.render_select(ui),
                EditorStep::Crop => self.render_crop(ui),
                EditorStep::Adjust => self.render_adjust(ui),
            },
        });

        self.render_settings_window(ctx);

        let idle = self.screen() == Screen::Editor && self.session.step() == EditorStep::Select;
        if idle && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

/// Routes input to `crop` and draws the overlay on top of the image.
fn crop_overlay(
    ui: &egui::Ui,
    response: &egui::Response,
    image_rect: egui::Rect,
    crop: &mut CropController,
) {
    let pointer = process_pointer(response, image_rect.min, crop);
    let keys = process_keys(ui, response, crop);
    if pointer.changed_crop() || keys.changed_crop() {
        ui.ctx().request_repaint();
    }
    if let Some(icon) = hover_cursor(response, image_rect.min, crop) {
        ui.ctx().set_cursor_icon(icon);
    }

    if crop.is_ready() {
        let area = crop.area();
        draw_crop_shade(ui.painter(), image_rect, area.to_rect(image_rect.min), SHADE_ALPHA);
        draw_crop_frame(ui.painter(), image_rect.min, area, response.has_focus());
    }
}

fn full_uv() -> egui::Rect {
    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0))
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
        Ok(()) => log::info!("Copied {} to the clipboard", text),
        Err(e) => log::warn!("Clipboard unavailable: {}", e),
    }
}

async fn upload_in_background(
    config: Config,
    request: UploadRequest,
    tx: Sender<UploadEvent>,
    ctx: egui::Context,
) -> Result<UploadOutcome> {
    let uploader = Uploader::new(config)?;
    uploader
        .upload(&request.file, request.crop, &request.transforms, move |percent| {
            let _ = tx.send(UploadEvent::Progress(percent));
            ctx.request_repaint();
        })
        .await
}

/// Downloads and decodes a transformed preview.
async fn fetch_image(url: &str) -> Result<egui::ColorImage> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| AppError::PreviewLoad(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::PreviewLoad(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::PreviewLoad(e.to_string()))?;
    let image = image::load_from_memory(&bytes).map_err(|e| AppError::PreviewLoad(e.to_string()))?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Launches the editor window and blocks until it is closed.
pub fn run(config: Config, initial: Option<PathBuf>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Tuus Imago")
            .with_inner_size([1024.0, 760.0])
            .with_min_inner_size([560.0, 420.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Tuus Imago",
        options,
        Box::new(move |_cc| Ok(Box::new(EditorApp::new(config, initial)) as Box<dyn eframe::App>)),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
