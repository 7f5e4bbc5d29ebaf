//! Transformation-chain URLs for the hosted image CDN.
//!
//! The CDN treats every `/`-delimited segment placed between the `/upload/`
//! marker and the version+filename suffix as one chained operation, so the
//! order in which segments are emitted is part of the output's meaning:
//!
//! ```text
//! crop -> rotate -> hflip -> vflip -> brightness -> contrast
//!      -> grayscale -> blur -> named preset -> AI effects
//! ```
//!
//! Neutral values emit nothing, and a request with nothing to emit returns the
//! input URL unchanged.

use crate::transform::{AiAdjustments, ImageTransformations};

/// Marker splitting the resource base path from its versioned filename.
pub const UPLOAD_MARKER: &str = "/upload/";

/// Crop segment used when the CDN picks the crop itself.
pub const AUTO_CROP_SEGMENT: &str = "c_auto,g_auto";

const DELIVERY_BASE: &str = "https://res.cloudinary.com";

/// How the crop slot of the chain is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropInstruction<'a> {
    #[default]
    None,
    /// `"x,y,w,h"` in natural pixels. Parsed leniently.
    Manual(&'a str),
    Auto,
}

/// Inputs of one composed URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewRequest<'a> {
    pub transforms: Option<&'a ImageTransformations>,
    pub crop: CropInstruction<'a>,
    pub ai: Option<&'a AiAdjustments>,
    pub ai_preset: Option<&'a str>,
}

impl<'a> PreviewRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transforms(mut self, transforms: &'a ImageTransformations) -> Self {
        self.transforms = Some(transforms);
        self
    }

    pub fn with_crop(mut self, crop: CropInstruction<'a>) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_ai(mut self, ai: &'a AiAdjustments) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_ai_preset(mut self, preset: Option<&'a str>) -> Self {
        self.ai_preset = preset;
        self
    }

    /// Transformation segments in chain order.
    pub fn segments(&self) -> Vec<String> {
        let mut parts = Vec::new();

        match self.crop {
            CropInstruction::Manual(coords) => {
                if let Some([x, y, w, h]) = parse_crop_coordinates(coords) {
                    parts.push(format!("c_crop,x_{x},y_{y},w_{w},h_{h}"));
                }
            }
            CropInstruction::Auto => parts.push(AUTO_CROP_SEGMENT.to_string()),
            CropInstruction::None => {}
        }

        if let Some(t) = self.transforms {
            if t.rotation != 0 {
                parts.push(format!("a_{}", t.rotation));
            }
            if t.flip_horizontal {
                parts.push("a_hflip".to_string());
            }
            if t.flip_vertical {
                parts.push("a_vflip".to_string());
            }
            if t.brightness != 0 {
                parts.push(format!("e_brightness:{}", t.brightness));
            }
            if t.contrast != 0 {
                parts.push(format!("e_contrast:{}", t.contrast));
            }
            if t.grayscale != 0 {
                parts.push(format!("e_grayscale:{}", t.grayscale));
            }
            if t.blur != 0.0 {
                parts.push(format!("e_blur:{}", t.blur));
            }
        }

        // A preset on its own is not an AI adjustment.
        if let Some(ai) = self.ai.filter(|ai| ai.any_active()) {
            if let Some(preset) = self.ai_preset.map(str::trim).filter(|p| !p.is_empty()) {
                parts.push(format!("t_{preset}"));
            }
            parts.extend(ai.active().map(|effect| effect.token().to_string()));
        }

        parts
    }

    /// Inserts the chain after the upload marker of `secure_url`.
    ///
    /// Returns `secure_url` unchanged when there is nothing to emit or the
    /// marker does not occur exactly once.
    pub fn compose(&self, secure_url: &str) -> String {
        let parts = self.segments();
        if parts.is_empty() {
            return secure_url.to_string();
        }

        let mut halves = secure_url.split(UPLOAD_MARKER);
        match (halves.next(), halves.next(), halves.next()) {
            (Some(base), Some(resource), None) => {
                format!("{base}{UPLOAD_MARKER}{}/{resource}", parts.join("/"))
            }
            _ => {
                log::debug!("No single upload marker in '{}', leaving URL as is", secure_url);
                secure_url.to_string()
            }
        }
    }
}

/// Composes a transformation URL from the editor's parameters.
///
/// `crop_coordinates` is an `"x,y,w,h"` natural-pixel tuple; anything with
/// fewer than four non-empty tokens is dropped without error.
pub fn compose_url(
    secure_url: &str,
    transforms: Option<&ImageTransformations>,
    crop_coordinates: Option<&str>,
    ai: Option<&AiAdjustments>,
    ai_preset: Option<&str>,
) -> String {
    PreviewRequest {
        transforms,
        crop: crop_coordinates.map_or(CropInstruction::None, CropInstruction::Manual),
        ai,
        ai_preset,
    }
    .compose(secure_url)
}

/// Plain delivery URL of an uploaded resource.
pub fn cdn_delivery_url(cloud_name: &str, public_id: &str) -> String {
    format!("{DELIVERY_BASE}/{cloud_name}/image{UPLOAD_MARKER}{public_id}")
}

/// Splits `"x,y,w,h"` into its first four non-empty tokens.
fn parse_crop_coordinates(raw: &str) -> Option<[&str; 4]> {
    let mut tokens = raw.split(',').map(str::trim).filter(|t| !t.is_empty());
    Some([tokens.next()?, tokens.next()?, tokens.next()?, tokens.next()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::AiEffect;

    const URL: &str = "https://res.cloudinary.com/demo/image/upload/v1712345678/tuus-imago/photo.jpg";

    fn segments_of(url: &str) -> Vec<String> {
        let rest = url
            .strip_prefix("https://res.cloudinary.com/demo/image/upload/")
            .unwrap();
        let rest = rest.strip_suffix("/v1712345678/tuus-imago/photo.jpg").unwrap();
        rest.split('/').map(str::to_string).collect()
    }

    #[test]
    fn neutral_input_is_identity() {
        assert_eq!(compose_url(URL, None, None, None, None), URL);

        let zero = ImageTransformations::default();
        let off = AiAdjustments::none();
        assert_eq!(compose_url(URL, Some(&zero), None, Some(&off), None), URL);
        assert_eq!(compose_url(URL, Some(&zero), Some(""), Some(&off), Some("studio")), URL);
    }

    #[test]
    fn segments_follow_chain_order() {
        let t = ImageTransformations {
            rotation: 45,
            flip_horizontal: true,
            flip_vertical: true,
            brightness: 10,
            contrast: -20,
            grayscale: 30,
            blur: 5.0,
        };
        let url = compose_url(URL, Some(&t), Some("10,20,300,400"), None, None);
        assert_eq!(
            segments_of(&url),
            vec![
                "c_crop,x_10,y_20,w_300,h_400",
                "a_45",
                "a_hflip",
                "a_vflip",
                "e_brightness:10",
                "e_contrast:-20",
                "e_grayscale:30",
                "e_blur:5",
            ]
        );
    }

    #[test]
    fn crop_only_inserts_single_segment() {
        let url = compose_url(URL, None, Some("10,20,300,400"), None, None);
        assert_eq!(segments_of(&url), vec!["c_crop,x_10,y_20,w_300,h_400"]);
    }

    #[test]
    fn crop_tokens_are_trimmed() {
        let url = compose_url(URL, None, Some(" 1, 2 ,3 , 4"), None, None);
        assert_eq!(segments_of(&url), vec!["c_crop,x_1,y_2,w_3,h_4"]);
    }

    #[test]
    fn malformed_crop_is_dropped() {
        assert_eq!(compose_url(URL, None, Some("10,20,300"), None, None), URL);
        assert_eq!(compose_url(URL, None, Some("10,,300,"), None, None), URL);

        let t = ImageTransformations {
            rotation: 90,
            ..Default::default()
        };
        let url = compose_url(URL, Some(&t), Some("1,2"), None, None);
        assert_eq!(segments_of(&url), vec!["a_90"]);
    }

    #[test]
    fn ai_flags_follow_declaration_order() {
        let ai = AiAdjustments {
            enhance: true,
            remove_background: true,
            upscale: true,
            restore: false,
        };
        let url = compose_url(URL, None, None, Some(&ai), None);
        assert_eq!(
            segments_of(&url),
            vec!["e_enhance", "e_background_removal", "e_upscale"]
        );
    }

    #[test]
    fn preset_precedes_ai_effects() {
        let mut ai = AiAdjustments::none();
        ai.toggle(AiEffect::Restore);
        ai.toggle(AiEffect::Enhance);
        let url = compose_url(URL, None, Some("0,0,10,10"), Some(&ai), Some("studio_portrait"));
        assert_eq!(
            segments_of(&url),
            vec!["c_crop,x_0,y_0,w_10,h_10", "t_studio_portrait", "e_enhance", "e_gen_restore"]
        );
    }

    #[test]
    fn auto_crop_fills_crop_slot() {
        let t = ImageTransformations {
            grayscale: 100,
            ..Default::default()
        };
        let url = PreviewRequest::new()
            .with_transforms(&t)
            .with_crop(CropInstruction::Auto)
            .compose(URL);
        assert_eq!(segments_of(&url), vec!["c_auto,g_auto", "e_grayscale:100"]);
    }

    #[test]
    fn missing_or_repeated_marker_fails_closed() {
        let t = ImageTransformations {
            rotation: 180,
            ..Default::default()
        };
        let no_marker = "https://example.com/images/photo.jpg";
        assert_eq!(compose_url(no_marker, Some(&t), Some("1,2,3,4"), None, None), no_marker);

        let twice = "https://cdn.example/upload/a/upload/photo.jpg";
        assert_eq!(compose_url(twice, Some(&t), None, None, None), twice);
    }

    #[test]
    fn delivery_url_uses_marker() {
        assert_eq!(
            cdn_delivery_url("demo", "tuus-imago/photo"),
            "https://res.cloudinary.com/demo/image/upload/tuus-imago/photo"
        );
    }
}
