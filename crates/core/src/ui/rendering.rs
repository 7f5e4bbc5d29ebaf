//! Drawing helpers for the crop overlay and image layout.

use crate::crop::{CropArea, Handle};
use eframe::egui;

/// Side length of the square corner handles.
const HANDLE_SIZE: f32 = 10.0;

/// Dims everything inside `image_rect` except the crop.
///
/// # Arguments
/// * `painter` - The egui painter to draw with
/// * `image_rect` - Where the photo is drawn
/// * `crop_rect` - The crop area in screen coordinates
/// * `alpha` - Darkness level (0-255, higher = darker)
pub fn draw_crop_shade(
    painter: &egui::Painter,
    image_rect: egui::Rect,
    crop_rect: egui::Rect,
    alpha: u8,
) {
    let color = egui::Color32::from_black_alpha(alpha);
    let crop_rect = crop_rect.intersect(image_rect);

    // Above
    painter.rect_filled(
        egui::Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, crop_rect.min.y)),
        0.0,
        color,
    );
    // Below
    painter.rect_filled(
        egui::Rect::from_min_max(egui::pos2(image_rect.min.x, crop_rect.max.y), image_rect.max),
        0.0,
        color,
    );
    // Left
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, crop_rect.min.y),
            egui::pos2(crop_rect.min.x, crop_rect.max.y),
        ),
        0.0,
        color,
    );
    // Right
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(crop_rect.max.x, crop_rect.min.y),
            egui::pos2(image_rect.max.x, crop_rect.max.y),
        ),
        0.0,
        color,
    );
}

/// Draws the crop border, rule-of-thirds guides and the four handles.
pub fn draw_crop_frame(
    painter: &egui::Painter,
    origin: egui::Pos2,
    crop: CropArea,
    focused: bool,
) {
    let rect = crop.to_rect(origin);
    let color = if focused {
        egui::Color32::from_rgb(120, 180, 255)
    } else {
        egui::Color32::WHITE
    };

    painter.rect_stroke(rect, 0.0, egui::Stroke::new(2.0, color), egui::StrokeKind::Middle);

    let guide = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(90));
    for i in 1..3 {
        let t = i as f32 / 3.0;
        let x = rect.min.x + rect.width() * t;
        let y = rect.min.y + rect.height() * t;
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], guide);
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], guide);
    }

    for handle in Handle::ALL {
        let center = origin + crop.corner(handle).to_vec2();
        painter.rect_filled(
            egui::Rect::from_center_size(center, egui::vec2(HANDLE_SIZE, HANDLE_SIZE)),
            2.0,
            color,
        );
    }
}

/// Size of an image of `natural` pixels scaled to fit inside `available`,
/// keeping its aspect ratio and never enlarging it.
pub fn fit_size(natural: [usize; 2], available: egui::Vec2) -> egui::Vec2 {
    let (w, h) = (natural[0] as f32, natural[1] as f32);
    if w <= 0.0 || h <= 0.0 || available.x <= 0.0 || available.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let factor = (available.x / w).min(available.y / h).min(1.0);
    egui::vec2((w * factor).floor(), (h * factor).floor())
}
