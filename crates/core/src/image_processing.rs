//! Source images and display/natural coordinate mapping.
//!
//! # Coordinate Mapping
//!
//! The editor displays the photo scaled to fit the window (e.g. 480x320)
//! while the file itself has its natural resolution (e.g. 4800x3200). Crop
//! rectangles are edited in display space; everything that reaches the CDN
//! or the renderer's sampler is expressed in natural pixels:
//!
//! ```text
//! scale   = natural / display        (per axis)
//! natural = display * scale
//! ```

use crate::crop::CropArea;
use crate::error::{AppError, Result};
use crate::upload::{validate_file, ValidatedFile};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use eframe::egui;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// JPEG quality of preview snapshots.
pub const SNAPSHOT_QUALITY: u8 = 95;

/// A decoded photo together with the validated file it came from.
///
/// Owning the bytes here plays the role of a temporary object URL: the data
/// lives exactly as long as the editor holds this value and is released once
/// when it is replaced or dropped.
///
/// Pixels are converted to RGBA once at load so repeated renders only read
/// them.
pub struct SourceImage {
    file: ValidatedFile,
    pixels: RgbaImage,
}

impl SourceImage {
    /// Reads, validates and decodes a file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for unsupported or oversized files,
    /// [`AppError::Io`] if the file cannot be read, and
    /// [`AppError::ImageProcessing`] if decoding fails.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        Self::from_bytes(name, bytes)
    }

    /// Validates and decodes in-memory file contents.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file = validate_file(name, bytes)?;
        let image = image::load_from_memory(file.bytes())
            .map_err(|e| AppError::image(format!("Failed to decode {}: {}", file.name(), e)))?;
        let (width, height) = image.dimensions();
        log::debug!(
            "Loaded {} ({}, {}x{}, {} bytes)",
            file.name(),
            file.mime(),
            width,
            height,
            file.len()
        );
        Ok(Self {
            file,
            pixels: image.into_rgba8(),
        })
    }

    pub fn file(&self) -> &ValidatedFile {
        &self.file
    }

    /// Decoded pixels in natural resolution.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Natural size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Converts to an egui texture source. Copies the pixels; do it once per image.
    pub fn to_color_image(&self) -> egui::ColorImage {
        let size = [self.pixels.width() as usize, self.pixels.height() as usize];
        egui::ColorImage::from_rgba_unmultiplied(size, self.pixels.as_raw())
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("file", &self.file)
            .field("dimensions", &self.pixels.dimensions())
            .finish()
    }
}

/// Display-to-natural scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    pub x: f32,
    pub y: f32,
}

impl DisplayScale {
    /// Derives the factors; `None` while the display size is unknown.
    pub fn new(natural: (u32, u32), display: egui::Vec2) -> Option<Self> {
        if display.x <= 0.0 || display.y <= 0.0 || natural.0 == 0 || natural.1 == 0 {
            return None;
        }
        Some(Self {
            x: natural.0 as f32 / display.x,
            y: natural.1 as f32 / display.y,
        })
    }

    pub fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }

    /// Maps a display-space crop into natural pixels, clamped to the image.
    ///
    /// Returns `(x, y, width, height)` as floats for sub-pixel sampling.
    pub fn to_natural(&self, crop: CropArea, natural: (u32, u32)) -> (f32, f32, f32, f32) {
        let (nw, nh) = (natural.0 as f32, natural.1 as f32);
        let x = (crop.x * self.x).clamp(0.0, nw);
        let y = (crop.y * self.y).clamp(0.0, nh);
        let w = (crop.width * self.x).min(nw - x).max(0.0);
        let h = (crop.height * self.y).min(nh - y).max(0.0);
        (x, y, w, h)
    }
}

/// Rounded natural-pixel crop, as sent in `custom_coordinates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl NaturalCrop {
    /// Editor path: display value times scale, rounded.
    pub fn from_display(crop: CropArea, scale: DisplayScale) -> Option<Self> {
        if !crop.is_established() {
            return None;
        }
        Some(Self {
            x: round_px(crop.x * scale.x),
            y: round_px(crop.y * scale.y),
            width: round_px(crop.width * scale.x),
            height: round_px(crop.height * scale.y),
        })
    }

    /// Preview path: the crop as a fraction of the displayed preview, applied
    /// to the uploaded resource's dimensions.
    pub fn from_preview(crop: CropArea, display: egui::Vec2, uploaded: (u32, u32)) -> Option<Self> {
        if display.x <= 0.0 || display.y <= 0.0 || !crop.is_established() {
            return None;
        }
        let (uw, uh) = (uploaded.0 as f32, uploaded.1 as f32);
        Some(Self {
            x: round_px(crop.x / display.x * uw),
            y: round_px(crop.y / display.y * uh),
            width: round_px(crop.width / display.x * uw),
            height: round_px(crop.height / display.y * uh),
        })
    }
}

impl fmt::Display for NaturalCrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for NaturalCrop {
    type Err = AppError;

    /// Parses `"x,y,w,h"`, the format of `custom_coordinates`.
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::validation(format!("Invalid crop '{}': {}", s, e)))?;
        match values[..] {
            [x, y, width, height] if width > 0 && height > 0 => Ok(Self { x, y, width, height }),
            _ => Err(AppError::validation(format!(
                "Invalid crop '{}': expected x,y,width,height with a non-zero size",
                s
            ))),
        }
    }
}

fn round_px(value: f32) -> u32 {
    value.round().max(0.0) as u32
}

/// Encodes an RGBA surface as a `data:image/jpeg;base64,` URL.
///
/// JPEG has no alpha channel, so transparent pixels come out black, as they
/// do when a browser canvas is exported to JPEG.
pub fn encode_jpeg_data_url(surface: &RgbaImage, quality: u8) -> Result<String> {
    let rgb = DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
    let mut buffer: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| AppError::image(format!("Failed to encode snapshot: {}", e)))?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(buffer)))
}
