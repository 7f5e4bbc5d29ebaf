//! Square crop rectangle and its interaction state machine.
//!
//! All values are display-space pixels, relative to the top-left corner of
//! the rendered image. The controller never rejects input: moves and resizes
//! are clamped so the rectangle stays square and inside the display bounds.
//!
//! ```text
//!            pointer down on body            pointer up / leaves window
//!   Idle ─────────────────────────▶ Dragging ───────────────────────▶ Idle
//!     │     pointer down on handle                                   ▲
//!     └───────────────────────────▶ Resizing(handle) ───────────────┘
//! ```

use crate::i18n;
use eframe::egui;
use serde::{Deserialize, Serialize};

/// Smallest side reachable by dragging a corner handle.
pub const MIN_POINTER_CROP_SIZE: f32 = 50.0;
/// Arrow-key move distance.
pub const CROP_MOVE_STEP: f32 = 10.0;
/// Shift+arrow resize distance.
pub const CROP_RESIZE_STEP: f32 = 10.0;
/// Fraction of the shorter image side covered by the initial crop.
pub const INITIAL_CROP_FRACTION: f32 = 0.8;
/// Pointer distance from a corner that still grabs its handle.
pub const HANDLE_HIT_RADIUS: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropArea {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// A zero-sized crop has not been placed yet; consumers fall back to the
    /// uncropped source.
    pub fn is_established(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn corner(&self, handle: Handle) -> egui::Pos2 {
        match handle {
            Handle::Nw => egui::pos2(self.x, self.y),
            Handle::Ne => egui::pos2(self.right(), self.y),
            Handle::Se => egui::pos2(self.right(), self.bottom()),
            Handle::Sw => egui::pos2(self.x, self.bottom()),
        }
    }

    pub fn contains(&self, pos: egui::Pos2) -> bool {
        pos.x >= self.x && pos.x <= self.right() && pos.y >= self.y && pos.y <= self.bottom()
    }

    /// Screen rectangle for a crop drawn over an image whose top-left is at
    /// `origin`.
    pub fn to_rect(&self, origin: egui::Pos2) -> egui::Rect {
        egui::Rect::from_min_size(
            origin + egui::vec2(self.x, self.y),
            egui::vec2(self.width, self.height),
        )
    }

    /// Centred square covering [`INITIAL_CROP_FRACTION`] of the shorter side.
    pub fn initial_square(bounds: egui::Vec2) -> Self {
        Self::initial_square_in(bounds, egui::Vec2::ZERO)
    }

    /// Same as [`CropArea::initial_square`] for an image letterboxed at
    /// `offset` inside its container.
    pub fn initial_square_in(bounds: egui::Vec2, offset: egui::Vec2) -> Self {
        let side = bounds.x.min(bounds.y).max(0.0) * INITIAL_CROP_FRACTION;
        Self {
            x: offset.x + (bounds.x - side) / 2.0,
            y: offset.y + (bounds.y - side) / 2.0,
            width: side,
            height: side,
        }
    }
}

/// Corner handles, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Nw,
    Ne,
    Se,
    Sw,
}

impl Handle {
    pub const ALL: [Handle; 4] = [Handle::Nw, Handle::Ne, Handle::Se, Handle::Sw];

    /// +1 when dragging right grows the rectangle, -1 otherwise.
    fn grow_x(self) -> f32 {
        match self {
            Handle::Ne | Handle::Se => 1.0,
            Handle::Nw | Handle::Sw => -1.0,
        }
    }

    /// +1 when dragging down grows the rectangle, -1 otherwise.
    fn grow_y(self) -> f32 {
        match self {
            Handle::Se | Handle::Sw => 1.0,
            Handle::Nw | Handle::Ne => -1.0,
        }
    }

    pub fn cursor(self) -> egui::CursorIcon {
        match self {
            Handle::Nw | Handle::Se => egui::CursorIcon::ResizeNwSe,
            Handle::Ne | Handle::Sw => egui::CursorIcon::ResizeNeSw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging,
    Resizing(Handle),
}

/// What a pointer position would grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle(Handle),
    Body,
}

/// Result of a key press routed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The crop changed (or was clamped in place); consume the event.
    Handled,
    /// Not a crop key; leave the event to others.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardConfig {
    pub move_step: f32,
    pub resize_step: f32,
    pub min_size: f32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            move_step: CROP_MOVE_STEP,
            resize_step: CROP_RESIZE_STEP,
            min_size: MIN_POINTER_CROP_SIZE,
        }
    }
}

/// Owns the crop rectangle and the active pointer gesture.
#[derive(Debug, Clone, Default)]
pub struct CropController {
    area: CropArea,
    bounds: egui::Vec2,
    gesture: Gesture,
    last_pointer: Option<egui::Pos2>,
    keyboard: KeyboardConfig,
    announcement: String,
}

impl CropController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyboard(mut self, keyboard: KeyboardConfig) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn area(&self) -> CropArea {
        self.area
    }

    pub fn bounds(&self) -> egui::Vec2 {
        self.bounds
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Latest status text for assistive output. Empty until a keyboard change.
    pub fn announcement(&self) -> &str {
        &self.announcement
    }

    pub fn is_ready(&self) -> bool {
        self.area.is_established() && self.bounds.x > 0.0 && self.bounds.y > 0.0
    }

    /// Forgets the rectangle, e.g. when a new source image is loaded.
    pub fn reset(&mut self) {
        self.area = CropArea::default();
        self.bounds = egui::Vec2::ZERO;
        self.gesture = Gesture::Idle;
        self.last_pointer = None;
        self.announcement.clear();
    }

    /// Records the rendered image size. Places the initial square if none is
    /// established yet, otherwise re-clamps the current one.
    pub fn set_bounds(&mut self, bounds: egui::Vec2) {
        self.bounds = egui::vec2(bounds.x.max(0.0), bounds.y.max(0.0));
        if self.area.is_established() {
            self.area = self.clamped_square(self.area);
        } else if self.bounds.x > 0.0 && self.bounds.y > 0.0 {
            self.area = CropArea::initial_square(self.bounds);
        }
    }

    /// Replaces the rectangle, forcing it square and in bounds.
    pub fn set_area(&mut self, area: CropArea) {
        self.area = self.clamped_square(area);
    }

    pub fn hit_test(&self, pos: egui::Pos2) -> Option<HitTarget> {
        if !self.is_ready() {
            return None;
        }
        // Handles sit on top of the body.
        let handle = Handle::ALL
            .into_iter()
            .find(|h| self.area.corner(*h).distance(pos) <= HANDLE_HIT_RADIUS);
        match handle {
            Some(h) => Some(HitTarget::Handle(h)),
            None if self.area.contains(pos) => Some(HitTarget::Body),
            None => None,
        }
    }

    /// Starts a drag or resize depending on what is under the pointer.
    pub fn pointer_down(&mut self, pos: egui::Pos2) -> Gesture {
        match self.hit_test(pos) {
            Some(HitTarget::Handle(h)) => self.pointer_down_handle(h, pos),
            Some(HitTarget::Body) => self.pointer_down_body(pos),
            None => self.gesture,
        }
    }

    pub fn pointer_down_body(&mut self, pos: egui::Pos2) -> Gesture {
        self.begin(Gesture::Dragging, pos)
    }

    pub fn pointer_down_handle(&mut self, handle: Handle, pos: egui::Pos2) -> Gesture {
        self.begin(Gesture::Resizing(handle), pos)
    }

    fn begin(&mut self, gesture: Gesture, pos: egui::Pos2) -> Gesture {
        if self.gesture == Gesture::Idle && self.is_ready() {
            self.gesture = gesture;
            self.last_pointer = Some(pos);
        }
        self.gesture
    }

    /// Applies the delta since the previous move event.
    pub fn pointer_move(&mut self, pos: egui::Pos2) {
        let Some(last) = self.last_pointer else {
            return;
        };
        let delta = pos - last;
        self.last_pointer = Some(pos);

        match self.gesture {
            Gesture::Idle => {}
            Gesture::Dragging => self.translate(delta),
            Gesture::Resizing(handle) => self.resize_from(handle, delta),
        }
    }

    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
        self.last_pointer = None;
    }

    pub fn pointer_left_window(&mut self) {
        self.pointer_up();
    }

    fn translate(&mut self, delta: egui::Vec2) {
        let a = self.area;
        self.area.x = (a.x + delta.x).clamp(0.0, (self.bounds.x - a.width).max(0.0));
        self.area.y = (a.y + delta.y).clamp(0.0, (self.bounds.y - a.height).max(0.0));
    }

    /// Rescales around the corner opposite `handle`.
    fn resize_from(&mut self, handle: Handle, delta: egui::Vec2) {
        let a = self.area;
        let step = (handle.grow_x() * delta.x).max(handle.grow_y() * delta.y);

        // Anchor and the room available beyond it on the growing side.
        let (anchor_x, room_x) = if handle.grow_x() > 0.0 {
            (a.x, self.bounds.x - a.x)
        } else {
            (a.right(), a.right())
        };
        let (anchor_y, room_y) = if handle.grow_y() > 0.0 {
            (a.y, self.bounds.y - a.y)
        } else {
            (a.bottom(), a.bottom())
        };
        let max_side = room_x.min(room_y).max(0.0);

        let side = (a.width + step).max(MIN_POINTER_CROP_SIZE).min(max_side);

        self.area = CropArea {
            x: if handle.grow_x() > 0.0 { anchor_x } else { anchor_x - side },
            y: if handle.grow_y() > 0.0 { anchor_y } else { anchor_y - side },
            width: side,
            height: side,
        };
    }

    /// Arrow keys move, Shift+arrow resizes. Every handled key refreshes the
    /// announcement text.
    pub fn handle_key(&mut self, key: egui::Key, shift: bool) -> KeyOutcome {
        if !self.is_ready() {
            return KeyOutcome::Ignored;
        }
        let a = self.area;
        let kb = self.keyboard;

        let next = if shift {
            let side = match key {
                egui::Key::ArrowLeft | egui::Key::ArrowUp => (a.width - kb.resize_step).max(kb.min_size),
                egui::Key::ArrowRight | egui::Key::ArrowDown => a.width + kb.resize_step,
                _ => return KeyOutcome::Ignored,
            };
            // Top-left stays put; the side shrinks to whatever still fits.
            let side = side.min(self.bounds.x - a.x).min(self.bounds.y - a.y).max(0.0);
            CropArea { width: side, height: side, ..a }
        } else {
            let (dx, dy) = match key {
                egui::Key::ArrowLeft => (-kb.move_step, 0.0),
                egui::Key::ArrowRight => (kb.move_step, 0.0),
                egui::Key::ArrowUp => (0.0, -kb.move_step),
                egui::Key::ArrowDown => (0.0, kb.move_step),
                _ => return KeyOutcome::Ignored,
            };
            self.clamped_square(CropArea { x: a.x + dx, y: a.y + dy, ..a })
        };

        self.area = next;
        self.announce();
        KeyOutcome::Handled
    }

    fn announce(&mut self) {
        let a = self.area;
        self.announcement = i18n::t_with(
            "upload.cropAreaAnnouncement",
            &[
                ("x", format!("{}", a.x.round())),
                ("y", format!("{}", a.y.round())),
                ("width", format!("{}", a.width.round())),
                ("height", format!("{}", a.height.round())),
            ],
        );
    }

    /// Squares `area` on its smaller side, shrinks it to fit the bounds and
    /// shifts it inside them. Anchored at the top-left where possible.
    fn clamped_square(&self, area: CropArea) -> CropArea {
        let limit = self.bounds.x.min(self.bounds.y).max(0.0);
        let side = area.width.min(area.height).clamp(0.0, limit);
        let x = area.x.clamp(0.0, (self.bounds.x - side).max(0.0));
        let y = area.y.clamp(0.0, (self.bounds.y - side).max(0.0));
        CropArea {
            x,
            y,
            width: side,
            height: side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: egui::Vec2 = egui::vec2(400.0, 300.0);

    fn controller_at(area: CropArea) -> CropController {
        let mut c = CropController::new();
        c.set_bounds(BOUNDS);
        c.set_area(area);
        c
    }

    fn assert_valid(a: CropArea, bounds: egui::Vec2) {
        assert_eq!(a.width, a.height, "not square: {a:?}");
        assert!(a.x >= 0.0 && a.y >= 0.0, "negative origin: {a:?}");
        assert!(a.right() <= bounds.x + 1e-3, "past right edge: {a:?}");
        assert!(a.bottom() <= bounds.y + 1e-3, "past bottom edge: {a:?}");
    }

    #[test]
    fn initial_square_is_centred() {
        let a = CropArea::initial_square(BOUNDS);
        assert_eq!(a, CropArea::new(80.0, 30.0, 240.0, 240.0));

        let shifted = CropArea::initial_square_in(egui::vec2(100.0, 100.0), egui::vec2(5.0, 0.0));
        assert_eq!(shifted, CropArea::new(15.0, 10.0, 80.0, 80.0));
    }

    #[test]
    fn set_bounds_places_initial_crop() {
        let mut c = CropController::new();
        assert!(!c.is_ready());
        c.set_bounds(BOUNDS);
        assert!(c.is_ready());
        assert_eq!(c.area(), CropArea::initial_square(BOUNDS));
    }

    #[test]
    fn gesture_transitions() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        assert_eq!(c.pointer_down(egui::pos2(150.0, 150.0)), Gesture::Dragging);
        // A second press during a gesture does not switch it.
        assert_eq!(c.pointer_down(egui::pos2(200.0, 200.0)), Gesture::Dragging);
        c.pointer_up();
        assert_eq!(c.gesture(), Gesture::Idle);

        assert_eq!(
            c.pointer_down(egui::pos2(201.0, 199.0)),
            Gesture::Resizing(Handle::Se)
        );
        c.pointer_left_window();
        assert_eq!(c.gesture(), Gesture::Idle);

        assert_eq!(c.pointer_down(egui::pos2(10.0, 10.0)), Gesture::Idle);
    }

    #[test]
    fn drag_uses_incremental_deltas() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        c.pointer_down_body(egui::pos2(150.0, 150.0));
        c.pointer_move(egui::pos2(160.0, 155.0));
        c.pointer_move(egui::pos2(170.0, 160.0));
        assert_eq!(c.area(), CropArea::new(120.0, 110.0, 100.0, 100.0));
    }

    #[test]
    fn drag_far_outside_sticks_to_edges() {
        for (target, expected) in [
            (egui::pos2(-5000.0, 150.0), (0.0, 100.0)),
            (egui::pos2(5000.0, 150.0), (300.0, 100.0)),
            (egui::pos2(150.0, -5000.0), (100.0, 0.0)),
            (egui::pos2(150.0, 5000.0), (100.0, 200.0)),
            (egui::pos2(-5000.0, -5000.0), (0.0, 0.0)),
            (egui::pos2(5000.0, 5000.0), (300.0, 200.0)),
        ] {
            let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
            c.pointer_down_body(egui::pos2(150.0, 150.0));
            c.pointer_move(target);
            let a = c.area();
            assert_eq!((a.x, a.y), expected, "target {target:?}");
            assert_valid(a, BOUNDS);
        }
    }

    #[test]
    fn drag_back_after_clamp_moves_immediately() {
        let mut c = controller_at(CropArea::new(250.0, 100.0, 100.0, 100.0));
        c.pointer_down_body(egui::pos2(300.0, 150.0));
        c.pointer_move(egui::pos2(400.0, 150.0)); // clamped at x = 300
        c.pointer_move(egui::pos2(390.0, 150.0));
        assert_eq!(c.area().x, 290.0);
    }

    #[test]
    fn resize_grows_from_every_corner() {
        let start = CropArea::new(100.0, 100.0, 100.0, 100.0);
        let cases = [
            (Handle::Se, egui::vec2(20.0, 5.0), CropArea::new(100.0, 100.0, 120.0, 120.0)),
            (Handle::Sw, egui::vec2(-20.0, 5.0), CropArea::new(80.0, 100.0, 120.0, 120.0)),
            (Handle::Ne, egui::vec2(5.0, -20.0), CropArea::new(100.0, 80.0, 120.0, 120.0)),
            (Handle::Nw, egui::vec2(-20.0, -20.0), CropArea::new(80.0, 80.0, 120.0, 120.0)),
        ];
        for (handle, delta, expected) in cases {
            let mut c = controller_at(start);
            let from = start.corner(handle);
            c.pointer_down_handle(handle, from);
            c.pointer_move(from + delta);
            assert_eq!(c.area(), expected, "{handle:?}");
        }
    }

    #[test]
    fn resize_shrink_has_floor() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        let from = c.area().corner(Handle::Nw);
        c.pointer_down_handle(Handle::Nw, from);
        c.pointer_move(from + egui::vec2(500.0, 500.0));
        assert_eq!(c.area(), CropArea::new(150.0, 150.0, 50.0, 50.0));
    }

    #[test]
    fn resize_growth_stops_at_bounds() {
        let mut c = controller_at(CropArea::new(250.0, 20.0, 100.0, 100.0));
        let from = c.area().corner(Handle::Se);
        c.pointer_down_handle(Handle::Se, from);
        c.pointer_move(from + egui::vec2(0.0, 1000.0));
        // Room to the right is 150, room below is 280.
        assert_eq!(c.area(), CropArea::new(250.0, 20.0, 150.0, 150.0));

        let mut c = controller_at(CropArea::new(30.0, 40.0, 100.0, 100.0));
        let from = c.area().corner(Handle::Nw);
        c.pointer_down_handle(Handle::Nw, from);
        c.pointer_move(from + egui::vec2(-1000.0, -1000.0));
        assert_eq!(c.area(), CropArea::new(0.0, 10.0, 130.0, 130.0));
    }

    #[test]
    fn resize_sequences_keep_square_in_bounds() {
        let deltas = [
            egui::vec2(37.0, -12.0),
            egui::vec2(-80.0, 95.0),
            egui::vec2(400.0, 410.0),
            egui::vec2(-3.5, -7.25),
            egui::vec2(-600.0, 20.0),
            egui::vec2(11.0, -500.0),
            egui::vec2(0.5, 0.5),
        ];
        for handle in Handle::ALL {
            for start in [
                CropArea::new(0.0, 0.0, 60.0, 60.0),
                CropArea::new(150.0, 100.0, 100.0, 100.0),
                CropArea::new(340.0, 240.0, 60.0, 60.0),
            ] {
                let mut c = controller_at(start);
                let mut pos = start.corner(handle);
                c.pointer_down_handle(handle, pos);
                for d in deltas {
                    pos += d;
                    c.pointer_move(pos);
                    assert_valid(c.area(), BOUNDS);
                }
                c.pointer_up();
            }
        }
    }

    #[test]
    fn arrow_keys_move_and_announce() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        assert_eq!(c.handle_key(egui::Key::ArrowRight, false), KeyOutcome::Handled);
        assert_eq!(c.area().x, 110.0);
        assert_eq!(
            c.announcement(),
            "Crop area moved to x 110, y 100, size 100 by 100"
        );

        c.handle_key(egui::Key::ArrowUp, false);
        assert_eq!(c.area().y, 90.0);
        assert!(c.announcement().contains("y 90"));
    }

    #[test]
    fn arrow_keys_clamp_and_still_announce() {
        let mut c = controller_at(CropArea::new(3.0, 0.0, 100.0, 100.0));
        assert_eq!(c.handle_key(egui::Key::ArrowLeft, false), KeyOutcome::Handled);
        assert_eq!(c.area().x, 0.0);
        assert!(c.announcement().contains("x 0"));

        let previous = c.announcement().to_string();
        c.handle_key(egui::Key::ArrowUp, false);
        assert_eq!(c.area().y, 0.0);
        assert_eq!(c.announcement(), previous);
    }

    #[test]
    fn shift_arrows_resize_square() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        c.handle_key(egui::Key::ArrowRight, true);
        assert_eq!(c.area(), CropArea::new(100.0, 100.0, 110.0, 110.0));
        c.handle_key(egui::Key::ArrowUp, true);
        assert_eq!(c.area(), CropArea::new(100.0, 100.0, 100.0, 100.0));

        let mut c = controller_at(CropArea::new(100.0, 100.0, 55.0, 55.0));
        c.handle_key(egui::Key::ArrowLeft, true);
        assert_eq!(c.area().width, 50.0);

        let mut c = controller_at(CropArea::new(300.0, 150.0, 95.0, 95.0));
        c.handle_key(egui::Key::ArrowDown, true);
        assert_valid(c.area(), BOUNDS);
        assert_eq!(c.area().width, 100.0);
        c.handle_key(egui::Key::ArrowDown, true);
        assert_eq!(c.area().width, 100.0);
    }

    #[test]
    fn keyboard_min_size_is_configurable() {
        let mut c = CropController::new().with_keyboard(KeyboardConfig {
            min_size: 20.0,
            ..Default::default()
        });
        c.set_bounds(BOUNDS);
        c.set_area(CropArea::new(0.0, 0.0, 25.0, 25.0));
        c.handle_key(egui::Key::ArrowLeft, true);
        assert_eq!(c.area().width, 20.0);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut c = controller_at(CropArea::new(100.0, 100.0, 100.0, 100.0));
        assert_eq!(c.handle_key(egui::Key::A, false), KeyOutcome::Ignored);
        assert_eq!(c.handle_key(egui::Key::Enter, true), KeyOutcome::Ignored);
        assert!(c.announcement().is_empty());
        assert_eq!(c.area(), CropArea::new(100.0, 100.0, 100.0, 100.0));
    }

    #[test]
    fn unestablished_crop_ignores_input() {
        let mut c = CropController::new();
        assert_eq!(c.handle_key(egui::Key::ArrowLeft, false), KeyOutcome::Ignored);
        assert_eq!(c.pointer_down(egui::pos2(1.0, 1.0)), Gesture::Idle);
        c.pointer_move(egui::pos2(50.0, 50.0));
        assert!(!c.area().is_established());
    }

    #[test]
    fn shrinking_bounds_reclamps_crop() {
        let mut c = controller_at(CropArea::new(200.0, 100.0, 200.0, 200.0));
        c.set_bounds(egui::vec2(250.0, 150.0));
        assert_valid(c.area(), egui::vec2(250.0, 150.0));
        assert_eq!(c.area().width, 150.0);
    }
}
