//! Edit parameters shared by the URL composer and the local renderer.
//!
//! [`ImageTransformations`] holds the geometric and filter values chosen in the
//! adjust step, [`AiAdjustments`] the CDN-side effect flags toggled after the
//! upload. Neither type references the other.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const BRIGHTNESS_RANGE: (i32, i32) = (-100, 100);
pub const CONTRAST_RANGE: (i32, i32) = (-100, 100);
pub const GRAYSCALE_RANGE: (i32, i32) = (0, 100);
pub const BLUR_RANGE: (f32, f32) = (0.0, 10.0);

/// Geometric transforms and client-side filters.
///
/// `Default` is the neutral value: every field zero or false.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTransformations {
    /// Degrees in `[0, 360)`.
    pub rotation: i32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub brightness: i32,
    pub contrast: i32,
    pub grayscale: i32,
    pub blur: f32,
}

impl ImageTransformations {
    /// Rotates by `delta` degrees, keeping the result in `[0, 360)`.
    pub fn rotate(&mut self, delta: i32) {
        self.rotation = (self.rotation + delta).rem_euclid(360);
    }

    pub fn toggle_flip_horizontal(&mut self) {
        self.flip_horizontal = !self.flip_horizontal;
    }

    pub fn toggle_flip_vertical(&mut self) {
        self.flip_vertical = !self.flip_vertical;
    }

    pub fn set_brightness(&mut self, value: i32) {
        self.brightness = value.clamp(BRIGHTNESS_RANGE.0, BRIGHTNESS_RANGE.1);
    }

    pub fn set_contrast(&mut self, value: i32) {
        self.contrast = value.clamp(CONTRAST_RANGE.0, CONTRAST_RANGE.1);
    }

    pub fn set_grayscale(&mut self, value: i32) {
        self.grayscale = value.clamp(GRAYSCALE_RANGE.0, GRAYSCALE_RANGE.1);
    }

    pub fn set_blur(&mut self, value: f32) {
        self.blur = if value.is_finite() {
            value.clamp(BLUR_RANGE.0, BLUR_RANGE.1)
        } else {
            0.0
        };
    }

    /// True when any field differs from the neutral value.
    pub fn is_modified(&self) -> bool {
        *self != Self::default()
    }

    /// Audit string sent next to the upload, e.g.
    /// `rotation=90|flipHorizontal=true|...|blur=2.5`.
    pub fn context(&self) -> TransformContext<'_> {
        TransformContext(self)
    }
}

/// Display adapter producing the `|`-joined transform record.
pub struct TransformContext<'a>(&'a ImageTransformations);

impl fmt::Display for TransformContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.0;
        write!(
            f,
            "rotation={}|flipHorizontal={}|flipVertical={}|brightness={}|contrast={}|grayscale={}|blur={}",
            t.rotation, t.flip_horizontal, t.flip_vertical, t.brightness, t.contrast, t.grayscale, t.blur
        )
    }
}

/// CDN-side AI effect flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAdjustments {
    pub enhance: bool,
    pub remove_background: bool,
    pub upscale: bool,
    pub restore: bool,
}

impl Default for AiAdjustments {
    fn default() -> Self {
        Self {
            enhance: true,
            remove_background: false,
            upscale: false,
            restore: false,
        }
    }
}

impl AiAdjustments {
    /// All flags off.
    pub fn none() -> Self {
        Self {
            enhance: false,
            remove_background: false,
            upscale: false,
            restore: false,
        }
    }

    pub fn get(&self, effect: AiEffect) -> bool {
        match effect {
            AiEffect::Enhance => self.enhance,
            AiEffect::RemoveBackground => self.remove_background,
            AiEffect::Upscale => self.upscale,
            AiEffect::Restore => self.restore,
        }
    }

    pub fn toggle(&mut self, effect: AiEffect) {
        let flag = match effect {
            AiEffect::Enhance => &mut self.enhance,
            AiEffect::RemoveBackground => &mut self.remove_background,
            AiEffect::Upscale => &mut self.upscale,
            AiEffect::Restore => &mut self.restore,
        };
        *flag = !*flag;
    }

    pub fn any_active(&self) -> bool {
        self.active().next().is_some()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Active effects in declaration order.
    pub fn active(&self) -> impl Iterator<Item = AiEffect> + '_ {
        AiEffect::ALL.into_iter().filter(|effect| self.get(*effect))
    }
}

/// One AI effect and its fixed CDN token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiEffect {
    Enhance,
    RemoveBackground,
    Upscale,
    Restore,
}

impl AiEffect {
    /// Declaration order; the composer emits tokens in this order.
    pub const ALL: [AiEffect; 4] = [
        AiEffect::Enhance,
        AiEffect::RemoveBackground,
        AiEffect::Upscale,
        AiEffect::Restore,
    ];

    pub fn token(self) -> &'static str {
        match self {
            AiEffect::Enhance => "e_enhance",
            AiEffect::RemoveBackground => "e_background_removal",
            AiEffect::Upscale => "e_upscale",
            AiEffect::Restore => "e_gen_restore",
        }
    }

    /// Message catalog key of the toggle label.
    pub fn label_key(self) -> &'static str {
        match self {
            AiEffect::Enhance => "upload.aiEnhance",
            AiEffect::RemoveBackground => "upload.aiRemoveBackground",
            AiEffect::Upscale => "upload.aiUpscale",
            AiEffect::Restore => "upload.aiRestore",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_both_ways() {
        let mut t = ImageTransformations::default();
        t.rotate(-90);
        assert_eq!(t.rotation, 270);
        t.rotate(180);
        assert_eq!(t.rotation, 90);
        t.rotate(270);
        assert_eq!(t.rotation, 0);
    }

    #[test]
    fn setters_clamp_to_range() {
        let mut t = ImageTransformations::default();
        t.set_brightness(250);
        t.set_contrast(-250);
        t.set_grayscale(-5);
        t.set_blur(42.0);
        assert_eq!(t.brightness, 100);
        assert_eq!(t.contrast, -100);
        assert_eq!(t.grayscale, 0);
        assert_eq!(t.blur, 10.0);

        t.set_blur(f32::NAN);
        assert_eq!(t.blur, 0.0);
    }

    #[test]
    fn context_lists_every_field_in_order() {
        let t = ImageTransformations {
            rotation: 90,
            flip_horizontal: true,
            flip_vertical: false,
            brightness: 10,
            contrast: -20,
            grayscale: 30,
            blur: 2.5,
        };
        assert_eq!(
            t.context().to_string(),
            "rotation=90|flipHorizontal=true|flipVertical=false|brightness=10|contrast=-20|grayscale=30|blur=2.5"
        );
        assert_eq!(
            ImageTransformations::default().context().to_string(),
            "rotation=0|flipHorizontal=false|flipVertical=false|brightness=0|contrast=0|grayscale=0|blur=0"
        );
    }

    #[test]
    fn default_ai_adjustments_enable_enhance_only() {
        let ai = AiAdjustments::default();
        assert_eq!(ai.active().collect::<Vec<_>>(), vec![AiEffect::Enhance]);
        assert!(!AiAdjustments::none().any_active());
    }

    #[test]
    fn toggle_flips_single_flag() {
        let mut ai = AiAdjustments::none();
        ai.toggle(AiEffect::Upscale);
        ai.toggle(AiEffect::Restore);
        ai.toggle(AiEffect::Restore);
        assert_eq!(ai.active().collect::<Vec<_>>(), vec![AiEffect::Upscale]);
        assert_eq!(ai.active_count(), 1);
    }

    #[test]
    fn modified_detects_any_field() {
        let mut t = ImageTransformations::default();
        assert!(!t.is_modified());
        t.toggle_flip_vertical();
        assert!(t.is_modified());
    }
}
