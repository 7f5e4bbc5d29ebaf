//! Feeds egui pointer and keyboard input into a [`CropController`].
//!
//! The controller works in image-local coordinates, so every pointer
//! position is taken relative to the top-left corner of the drawn photo.

use crate::crop::{CropController, Gesture, HitTarget, KeyOutcome};
use eframe::egui;

/// What the input did to the crop during this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropInputEvent {
    /// A drag or resize gesture began.
    Started(Gesture),
    /// The active gesture moved the crop.
    Moved,
    /// The active gesture ended.
    Finished,
    /// Arrow keys moved or resized the crop.
    Keyboard,
    /// Nothing happened.
    None,
}

impl CropInputEvent {
    /// True when the rectangle may have changed and the overlay needs a redraw.
    pub fn changed_crop(self) -> bool {
        matches!(
            self,
            CropInputEvent::Started(_) | CropInputEvent::Moved | CropInputEvent::Keyboard
        )
    }
}

/// Processes pointer interaction on the image `response`.
///
/// # Arguments
/// * `response` - Response of the image area, sensing click and drag
/// * `origin` - Screen position of the image's top-left corner
/// * `crop` - The controller to update
pub fn process_pointer(
    response: &egui::Response,
    origin: egui::Pos2,
    crop: &mut CropController,
) -> CropInputEvent {
    let local = |pos: egui::Pos2| egui::pos2(pos.x - origin.x, pos.y - origin.y);

    if response.drag_started() {
        response.request_focus();
        // egui reports the drag only past its threshold; hit-test where the
        // button went down.
        let current = response.interact_pointer_pos();
        let press = response.ctx.input(|i| i.pointer.press_origin()).or(current);
        return match (press, current) {
            (Some(press), Some(current)) => start_gesture(crop, local(press), local(current)),
            _ => CropInputEvent::None,
        };
    }

    if response.clicked() {
        response.request_focus();
    }

    if crop.gesture() == Gesture::Idle {
        return CropInputEvent::None;
    }

    if response.drag_stopped() {
        crop.pointer_up();
        return CropInputEvent::Finished;
    }

    if !response.ctx.input(|i| i.pointer.has_pointer()) {
        crop.pointer_left_window();
        return CropInputEvent::Finished;
    }

    if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            crop.pointer_move(local(pos));
            return CropInputEvent::Moved;
        }
    }

    CropInputEvent::None
}

/// Starts a gesture at `press` and catches up with the pointer at `current`.
fn start_gesture(crop: &mut CropController, press: egui::Pos2, current: egui::Pos2) -> CropInputEvent {
    let gesture = crop.pointer_down(press);
    if gesture == Gesture::Idle {
        return CropInputEvent::None;
    }
    crop.pointer_move(current);
    CropInputEvent::Started(gesture)
}

/// Applies arrow-key presses while the image has keyboard focus.
///
/// Handled keys are consumed; all other keys are left for the rest of the
/// UI.
pub fn process_keys(ui: &egui::Ui, response: &egui::Response, crop: &mut CropController) -> CropInputEvent {
    if !response.has_focus() {
        return CropInputEvent::None;
    }

    // Keep arrow keys from moving focus to the next widget.
    ui.memory_mut(|m| {
        m.set_focus_lock_filter(
            response.id,
            egui::EventFilter {
                horizontal_arrows: true,
                vertical_arrows: true,
                ..Default::default()
            },
        )
    });

    let pressed: Vec<(egui::Key, egui::Modifiers)> = ui.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => Some((*key, *modifiers)),
                _ => None,
            })
            .collect()
    });

    let mut handled = false;
    for (key, modifiers) in pressed {
        if crop.handle_key(key, modifiers.shift) == KeyOutcome::Handled {
            ui.input_mut(|i| i.consume_key(modifiers, key));
            handled = true;
        }
    }

    if handled {
        CropInputEvent::Keyboard
    } else {
        CropInputEvent::None
    }
}

/// Cursor to show while hovering the image.
pub fn hover_cursor(
    response: &egui::Response,
    origin: egui::Pos2,
    crop: &CropController,
) -> Option<egui::CursorIcon> {
    match crop.gesture() {
        Gesture::Dragging => return Some(egui::CursorIcon::Grabbing),
        Gesture::Resizing(handle) => return Some(handle.cursor()),
        Gesture::Idle => {}
    }

    let pos = response.hover_pos()?;
    match crop.hit_test(egui::pos2(pos.x - origin.x, pos.y - origin.y))? {
        HitTarget::Handle(handle) => Some(handle.cursor()),
        HitTarget::Body => Some(egui::CursorIcon::Grab),
    }
}
