//! Local preview of the cropped, transformed photo.
//!
//! The renderer paints the natural-pixel crop onto a surface of at most
//! [`MAX_PREVIEW_DIMENSION`] pixels per side. The surface origin sits at its
//! centre; the crop is rotated and then mirrored around it. Each destination
//! pixel is mapped back through the inverse of that transform and sampled
//! bilinearly from the source, so nothing outside the crop leaks in.
//!
//! Filters then run in the order a CSS filter list would apply them:
//! grayscale, blur, brightness, contrast.

use crate::crop::CropArea;
use crate::error::{AppError, Result};
use crate::image_processing::{encode_jpeg_data_url, DisplayScale, SourceImage, SNAPSHOT_QUALITY};
use crate::transform::ImageTransformations;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::path::Path;

/// Longest side of a rendered preview.
pub const MAX_PREVIEW_DIMENSION: f32 = 600.0;

/// Output of one render: the raster surface and its JPEG data URL.
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    pub surface: RgbaImage,
    pub data_url: String,
}

impl RenderedPreview {
    pub fn size(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    /// Writes the surface to `path`; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        DynamicImage::ImageRgba8(self.surface.clone())
            .to_rgb8()
            .save(path)
            .map_err(|e| AppError::image(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewRenderer {
    max_dimension: f32,
    quality: u8,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self {
            max_dimension: MAX_PREVIEW_DIMENSION,
            quality: SNAPSHOT_QUALITY,
        }
    }
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `crop` (display space) of `source` with `transforms` applied
    /// and encodes the result as a data URL.
    ///
    /// An unestablished crop renders the whole image.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageProcessing`] when the crop maps to an empty
    /// region or the snapshot cannot be encoded.
    pub fn render(
        &self,
        source: &SourceImage,
        crop: CropArea,
        scale: DisplayScale,
        transforms: &ImageTransformations,
    ) -> Result<RenderedPreview> {
        let surface = self.render_surface(source, crop, scale, transforms)?;
        let data_url = encode_jpeg_data_url(&surface, self.quality)?;
        Ok(RenderedPreview { surface, data_url })
    }

    /// Same as [`render`](Self::render) without the JPEG export, for
    /// interactive refreshes that only display the surface.
    ///
    /// The surface is sized from the crop as it is shown on screen; the
    /// natural-pixel region only decides what gets sampled.
    pub fn render_surface(
        &self,
        source: &SourceImage,
        crop: CropArea,
        scale: DisplayScale,
        transforms: &ImageTransformations,
    ) -> Result<RgbaImage> {
        let natural = source.dimensions();
        let (region, shown) = if crop.is_established() {
            (scale.to_natural(crop, natural), (crop.width, crop.height))
        } else {
            let full = (natural.0 as f32, natural.1 as f32);
            ((0.0, 0.0, full.0, full.1), full)
        };
        if region.2 < 1.0 || region.3 < 1.0 {
            return Err(AppError::image("Crop area is outside the image"));
        }

        let factor = (self.max_dimension / shown.0)
            .min(self.max_dimension / shown.1)
            .min(1.0);
        let width = ((shown.0 * factor).round() as u32).max(1);
        let height = ((shown.1 * factor).round() as u32).max(1);

        let surface = paint(source.pixels(), region, width, height, transforms);
        let surface = apply_filters(surface, transforms);
        log::debug!(
            "Rendered {}x{} preview from crop {:?} with {:?}",
            width,
            height,
            region,
            transforms
        );
        Ok(surface)
    }
}

fn paint(
    src: &RgbaImage,
    (cx, cy, cw, ch): (f32, f32, f32, f32),
    width: u32,
    height: u32,
    transforms: &ImageTransformations,
) -> RgbaImage {
    let (w, h) = (width as f32, height as f32);
    let (half_w, half_h) = (w / 2.0, h / 2.0);
    let (sin, cos) = (transforms.rotation as f32).to_radians().sin_cos();
    let flip_x = if transforms.flip_horizontal { -1.0 } else { 1.0 };
    let flip_y = if transforms.flip_vertical { -1.0 } else { 1.0 };

    RgbaImage::from_fn(width, height, |px, py| {
        let dx = px as f32 + 0.5 - half_w;
        let dy = py as f32 + 0.5 - half_h;

        // Inverse rotation, then inverse mirror (a mirror is its own inverse).
        let u = (dx * cos + dy * sin) * flip_x;
        let v = (-dx * sin + dy * cos) * flip_y;

        if u.abs() > half_w || v.abs() > half_h {
            return Rgba([0, 0, 0, 0]);
        }

        let sx = cx + (u + half_w) * cw / w;
        let sy = cy + (v + half_h) * ch / h;
        sample_bilinear(src, sx, sy)
    })
}

fn sample_bilinear(src: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = src.width().saturating_sub(1) as f32;
    let max_y = src.height().saturating_sub(1) as f32;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);

    let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
    let x1 = (x0 + 1).min(max_x as u32);
    let y1 = (y0 + 1).min(max_y as u32);
    let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn apply_filters(mut surface: RgbaImage, t: &ImageTransformations) -> RgbaImage {
    if t.grayscale > 0 {
        let amount = t.grayscale as f32 / 100.0;
        map_rgb(&mut surface, |[r, g, b]| grayscale(r, g, b, amount));
    }

    if t.blur > 0.0 {
        surface = imageops::blur(&surface, t.blur);
    }

    if t.brightness != 0 {
        let k = (100 + t.brightness) as f32 / 100.0;
        map_rgb(&mut surface, |[r, g, b]| [r * k, g * k, b * k]);
    }

    if t.contrast != 0 {
        let k = (100 + t.contrast) as f32 / 100.0;
        let adjust = |c: f32| (c - 127.5) * k + 127.5;
        map_rgb(&mut surface, |[r, g, b]| [adjust(r), adjust(g), adjust(b)]);
    }

    surface
}

/// Filter Effects `grayscale()` matrix.
fn grayscale(r: f32, g: f32, b: f32, amount: f32) -> [f32; 3] {
    let keep = 1.0 - amount.clamp(0.0, 1.0);
    [
        (0.2126 + 0.7874 * keep) * r + (0.7152 - 0.7152 * keep) * g + (0.0722 - 0.0722 * keep) * b,
        (0.2126 - 0.2126 * keep) * r + (0.7152 + 0.2848 * keep) * g + (0.0722 - 0.0722 * keep) * b,
        (0.2126 - 0.2126 * keep) * r + (0.7152 - 0.7152 * keep) * g + (0.0722 + 0.9278 * keep) * b,
    ]
}

fn map_rgb(surface: &mut RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) {
    for pixel in surface.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [r, g, b] = f([r as f32, g as f32, b as f32]);
        pixel.0 = [to_channel(r), to_channel(g), to_channel(b), a];
    }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::tests::png_bytes;
    use eframe::egui;
    use image::{GenericImageView, ImageFormat};
    use std::io::Cursor;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 8x8 image: red top-left quadrant, blue elsewhere.
    fn quadrant_source() -> SourceImage {
        let img = RgbaImage::from_fn(8, 8, |x, y| if x < 4 && y < 4 { RED } else { BLUE });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        SourceImage::from_bytes("quadrants.png", bytes).unwrap()
    }

    fn render(source: &SourceImage, t: ImageTransformations) -> RgbaImage {
        PreviewRenderer::new()
            .render(source, CropArea::default(), DisplayScale::identity(), &t)
            .unwrap()
            .surface
    }

    fn is_red(p: &Rgba<u8>) -> bool {
        p.0[0] > 200 && p.0[2] < 50
    }

    #[test]
    fn large_crop_is_capped_to_600() {
        let source = SourceImage::from_bytes("big.png", png_bytes(1200, 800)).unwrap();
        let crop = CropArea::new(0.0, 0.0, 700.0, 700.0);
        let out = PreviewRenderer::new()
            .render(&source, crop, DisplayScale::identity(), &ImageTransformations::default())
            .unwrap();
        assert_eq!(out.size(), (600, 600));
        assert!(out.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn surface_follows_displayed_crop_size() {
        let source = SourceImage::from_bytes("big.png", png_bytes(1200, 800)).unwrap();
        let scale = DisplayScale::new((1200, 800), egui::vec2(150.0, 100.0)).unwrap();
        let crop = CropArea::new(10.0, 10.0, 80.0, 80.0);
        let surface = PreviewRenderer::new()
            .render_surface(&source, crop, scale, &ImageTransformations::default())
            .unwrap();
        assert_eq!(surface.dimensions(), (80, 80));
    }

    #[test]
    fn surface_render_matches_exported_render() {
        let source = quadrant_source();
        let t = ImageTransformations {
            rotation: 90,
            brightness: 20,
            ..Default::default()
        };
        let renderer = PreviewRenderer::new();
        let surface = renderer
            .render_surface(&source, CropArea::default(), DisplayScale::identity(), &t)
            .unwrap();
        let exported = renderer
            .render(&source, CropArea::default(), DisplayScale::identity(), &t)
            .unwrap();
        assert_eq!(surface, exported.surface);
    }

    #[test]
    fn small_source_is_not_upscaled() {
        let source = SourceImage::from_bytes("small.png", png_bytes(50, 30)).unwrap();
        let out = PreviewRenderer::new()
            .render(&source, CropArea::default(), DisplayScale::identity(), &ImageTransformations::default())
            .unwrap();
        assert_eq!(out.size(), (50, 30));
    }

    #[test]
    fn identity_keeps_pixels_in_place() {
        let surface = render(&quadrant_source(), ImageTransformations::default());
        assert!(is_red(surface.get_pixel(1, 1)));
        assert_eq!(*surface.get_pixel(6, 6), BLUE);
    }

    #[test]
    fn horizontal_flip_mirrors_columns() {
        let t = ImageTransformations {
            flip_horizontal: true,
            ..Default::default()
        };
        let surface = render(&quadrant_source(), t);
        assert!(is_red(surface.get_pixel(6, 1)));
        assert!(!is_red(surface.get_pixel(1, 1)));
    }

    #[test]
    fn vertical_flip_mirrors_rows() {
        let t = ImageTransformations {
            flip_vertical: true,
            ..Default::default()
        };
        let surface = render(&quadrant_source(), t);
        assert!(is_red(surface.get_pixel(1, 6)));
        assert!(!is_red(surface.get_pixel(1, 1)));
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        let t = ImageTransformations {
            rotation: 90,
            ..Default::default()
        };
        let surface = render(&quadrant_source(), t);
        assert!(is_red(surface.get_pixel(6, 1)));
        assert!(!is_red(surface.get_pixel(1, 1)));
        assert!(!is_red(surface.get_pixel(6, 6)));
    }

    #[test]
    fn crop_limits_sampled_region() {
        let source = quadrant_source();
        let crop = CropArea::new(4.0, 4.0, 4.0, 4.0);
        let out = PreviewRenderer::new()
            .render(&source, crop, DisplayScale::identity(), &ImageTransformations::default())
            .unwrap();
        assert_eq!(out.size(), (4, 4));
        assert!(out.surface.pixels().all(|p| !is_red(p)));
    }

    #[test]
    fn full_grayscale_equalises_channels() {
        let t = ImageTransformations {
            grayscale: 100,
            ..Default::default()
        };
        let surface = render(&quadrant_source(), t);
        let [r, g, b, _] = surface.get_pixel(1, 1).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 54);
    }

    #[test]
    fn brightness_and_contrast_scale_channels() {
        let mut surface = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 255]));
        surface = apply_filters(
            surface,
            &ImageTransformations {
                brightness: 50,
                ..Default::default()
            },
        );
        assert_eq!(surface.get_pixel(0, 0).0, [150, 150, 150, 255]);

        let dark = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 255]));
        let out = apply_filters(
            dark,
            &ImageTransformations {
                contrast: -100,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn save_writes_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let out = PreviewRenderer::new()
            .render(&quadrant_source(), CropArea::default(), DisplayScale::identity(), &ImageTransformations::default())
            .unwrap();
        out.save(&path).unwrap();
        assert_eq!(image::open(&path).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn crop_outside_image_is_an_error() {
        let source = quadrant_source();
        let crop = CropArea::new(20.0, 20.0, 4.0, 4.0);
        let err = PreviewRenderer::new()
            .render(&source, crop, DisplayScale::identity(), &ImageTransformations::default())
            .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
    }
}
