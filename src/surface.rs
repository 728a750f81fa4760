//! The drawing surface: brush configuration, background compositing, stroke
//! input and flattening to an encoded image.
//!
//! Everything above this module talks to [`DrawingSurface`] only; the stroke
//! representation inside [`RasterSurface`] is private.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage};

use crate::brush::{BrushColor, BrushConfig, BrushKind, StrokeBrush, StrokePoint};
use crate::error::{StudioError, StudioResult};
use crate::fit::CanvasDimensions;
use crate::raster::composite_over;

/// Largest surface edge in pixels. Keeps a bad bounds override from
/// allocating gigabytes.
pub const MAX_SURFACE_DIM: u32 = 32_768;

const JPEG_QUALITY: u8 = 92;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Flattened, encoded surface content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

/// Capability the mask tool needs from a drawing canvas.
pub trait DrawingSurface {
    fn dimensions(&self) -> CanvasDimensions;

    /// Replace the active stroke tool. Ends any stroke in progress.
    fn configure_brush(&mut self, kind: BrushKind, size: u32, color: BrushColor);

    /// Composite `image` at the top-left origin, pre-scaled by the factors.
    fn set_background_image(&mut self, image: &RgbaImage, scale_x: f64, scale_y: f64);

    /// Remove all strokes and the background image.
    fn clear(&mut self);

    fn begin_stroke(&mut self, p: StrokePoint);
    fn extend_stroke(&mut self, p: StrokePoint);
    fn end_stroke(&mut self);

    /// Flatten onto `background` and encode.
    fn export_to_image(
        &self,
        background: BrushColor,
        format: ExportFormat,
    ) -> StudioResult<EncodedImage>;

    /// What the user sees: display background, picture, strokes.
    fn composite(&self) -> RgbaImage;
}

// ============================================================================
// RASTER SURFACE
// ============================================================================

pub struct RasterSurface {
    width: u32,
    height: u32,
    display_background: BrushColor,
    /// Picture already scaled to its placed size.
    background: Option<RgbaImage>,
    /// Transparent wherever nothing has been painted.
    strokes: RgbaImage,
    brush_config: BrushConfig,
    brush: Box<dyn StrokeBrush>,
    stroke_active: bool,
    rng: fastrand::Rng,
    /// Flatten the picture into exports as well as the strokes.
    export_background_image: bool,
    /// Bumped on every pixel change; lets the GUI skip texture uploads.
    revision: u64,
}

impl RasterSurface {
    pub fn new(dims: CanvasDimensions, seed: u64) -> StudioResult<Self> {
        if dims.width == 0 || dims.height == 0 {
            return Err(StudioError::CanvasInit(format!(
                "surface must have positive area, got {}x{}",
                dims.width, dims.height
            )));
        }
        if dims.width > MAX_SURFACE_DIM || dims.height > MAX_SURFACE_DIM {
            return Err(StudioError::CanvasInit(format!(
                "surface {}x{} exceeds the {} px limit",
                dims.width, dims.height, MAX_SURFACE_DIM
            )));
        }

        let brush_config = BrushConfig::default();
        Ok(Self {
            width: dims.width,
            height: dims.height,
            display_background: BrushColor::BLACK,
            background: None,
            strokes: RgbaImage::new(dims.width, dims.height),
            brush: brush_config.build(),
            brush_config,
            stroke_active: false,
            rng: fastrand::Rng::with_seed(seed),
            export_background_image: false,
            revision: 0,
        })
    }

    pub fn set_export_background_image(&mut self, enabled: bool) {
        self.export_background_image = enabled;
    }

    pub fn brush_config(&self) -> &BrushConfig {
        &self.brush_config
    }

    pub fn has_background_image(&self) -> bool {
        self.background.is_some()
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke_active
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when no stroke has touched a pixel since the last clear.
    pub fn strokes_empty(&self) -> bool {
        self.strokes.pixels().all(|p| p.0[3] == 0)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn flatten(&self, background: BrushColor, with_picture: bool) -> RgbaImage {
        let [r, g, b] = background.rgb();
        let mut out = RgbaImage::from_pixel(self.width, self.height, Rgba([r, g, b, 255]));
        if with_picture && let Some(bg) = &self.background {
            composite_over(&mut out, bg);
        }
        composite_over(&mut out, &self.strokes);
        out
    }
}

impl DrawingSurface for RasterSurface {
    fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions {
            width: self.width,
            height: self.height,
        }
    }

    fn configure_brush(&mut self, kind: BrushKind, size: u32, color: BrushColor) {
        if self.stroke_active {
            self.end_stroke();
        }
        self.brush_config = BrushConfig::new(kind, size, color);
        self.brush = self.brush_config.build();
    }

    fn set_background_image(&mut self, image: &RgbaImage, scale_x: f64, scale_y: f64) {
        let (w, h) = image.dimensions();
        let target_w = ((w as f64 * scale_x).round() as u32).max(1);
        let target_h = ((h as f64 * scale_y).round() as u32).max(1);
        let placed = if (target_w, target_h) == (w, h) {
            image.clone()
        } else {
            image::imageops::resize(image, target_w, target_h, FilterType::Triangle)
        };
        self.background = Some(placed);
        self.touch();
    }

    fn clear(&mut self) {
        self.stroke_active = false;
        self.brush = self.brush_config.build();
        self.background = None;
        self.strokes = RgbaImage::new(self.width, self.height);
        self.touch();
    }

    fn begin_stroke(&mut self, p: StrokePoint) {
        if !p.is_finite() {
            return;
        }
        if self.stroke_active {
            self.end_stroke();
        }
        self.stroke_active = true;
        self.brush.begin(&mut self.strokes, &mut self.rng, p);
        self.touch();
    }

    fn extend_stroke(&mut self, p: StrokePoint) {
        if !self.stroke_active || !p.is_finite() {
            return;
        }
        self.brush.extend(&mut self.strokes, &mut self.rng, p);
        self.touch();
    }

    fn end_stroke(&mut self) {
        if !self.stroke_active {
            return;
        }
        self.stroke_active = false;
        self.brush.end(&mut self.strokes, &mut self.rng);
        self.touch();
    }

    fn export_to_image(
        &self,
        background: BrushColor,
        format: ExportFormat,
    ) -> StudioResult<EncodedImage> {
        let flat = self.flatten(background, self.export_background_image);
        let bytes = encode(&flat, format).map_err(|e| StudioError::MaskGeneration(e.to_string()))?;
        Ok(EncodedImage {
            bytes,
            format,
            width: self.width,
            height: self.height,
        })
    }

    fn composite(&self) -> RgbaImage {
        self.flatten(self.display_background, true)
    }
}

/// Encode into memory with the image crate's codecs.
pub fn encode(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut buf).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ColorType::Rgb8,
            )?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(w: u32, h: u32) -> RasterSurface {
        RasterSurface::new(CanvasDimensions { width: w, height: h }, 11).unwrap()
    }

    fn decode(encoded: &EncodedImage) -> RgbaImage {
        image::load_from_memory(&encoded.bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_new_rejects_bad_sizes() {
        let zero = RasterSurface::new(CanvasDimensions { width: 0, height: 5 }, 1);
        assert!(matches!(zero, Err(StudioError::CanvasInit(_))));
        let huge = RasterSurface::new(CanvasDimensions { width: 40_000, height: 5 }, 1);
        assert!(matches!(huge, Err(StudioError::CanvasInit(_))));
    }

    #[test]
    fn test_export_empty_surface_is_uniform_background() {
        let s = surface(32, 24);
        let encoded = s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap();
        assert_eq!((encoded.width, encoded.height), (32, 24));
        let img = decode(&encoded);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_export_excludes_picture_by_default() {
        let mut s = surface(16, 16);
        let picture = RgbaImage::from_pixel(16, 16, Rgba([200, 100, 50, 255]));
        s.set_background_image(&picture, 1.0, 1.0);
        let img = decode(&s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap());
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));

        s.set_export_background_image(true);
        let img = decode(&s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap());
        assert_eq!(img.get_pixel(3, 3).0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_composite_shows_scaled_picture_top_left() {
        let mut s = surface(20, 20);
        let picture = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 255, 255]));
        s.set_background_image(&picture, 0.5, 0.5);
        let view = s.composite();
        assert_eq!(view.get_pixel(5, 5).0, [0, 0, 255, 255]);
        // 40x20 at 0.5 covers the top 10 rows only
        assert_eq!(view.get_pixel(5, 15).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_stroke_shows_up_in_export() {
        let mut s = surface(40, 40);
        s.configure_brush(BrushKind::Pen, 8, BrushColor::WHITE);
        s.begin_stroke(StrokePoint::new(5.0, 20.0));
        s.extend_stroke(StrokePoint::new(35.0, 20.0));
        s.end_stroke();
        let img = decode(&s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap());
        assert_eq!(img.get_pixel(20, 20).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(20, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut s = surface(10, 10);
        s.extend_stroke(StrokePoint::new(5.0, 5.0));
        s.end_stroke();
        assert!(s.strokes_empty());
    }

    #[test]
    fn test_non_finite_points_ignored() {
        let mut s = surface(10, 10);
        s.begin_stroke(StrokePoint::new(f32::NAN, 5.0));
        assert!(!s.is_stroke_active());
        s.begin_stroke(StrokePoint::new(5.0, 5.0));
        let r = s.revision();
        s.extend_stroke(StrokePoint::new(f32::INFINITY, 5.0));
        assert_eq!(s.revision(), r);
        s.end_stroke();
    }

    #[test]
    fn test_clear_restores_initial_export() {
        let mut s = surface(24, 24);
        let initial = s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap();

        s.set_background_image(&RgbaImage::from_pixel(24, 24, Rgba([1, 2, 3, 255])), 1.0, 1.0);
        s.begin_stroke(StrokePoint::new(12.0, 12.0));
        s.end_stroke();
        s.clear();

        assert!(!s.has_background_image());
        assert!(s.strokes_empty());
        assert_eq!(s.export_to_image(BrushColor::BLACK, ExportFormat::Png).unwrap(), initial);
    }

    #[test]
    fn test_configure_brush_mid_stroke_ends_it() {
        let mut s = surface(10, 10);
        s.begin_stroke(StrokePoint::new(5.0, 5.0));
        s.configure_brush(BrushKind::Spray, 4, BrushColor([255, 0, 0]));
        assert!(!s.is_stroke_active());
        assert_eq!(s.brush_config().kind, BrushKind::Spray);
    }

    #[test]
    fn test_revision_tracks_changes() {
        let mut s = surface(10, 10);
        let r0 = s.revision();
        s.begin_stroke(StrokePoint::new(5.0, 5.0));
        assert!(s.revision() > r0);
    }

    #[test]
    fn test_jpeg_export_decodes() {
        let s = surface(8, 8);
        let encoded = s.export_to_image(BrushColor::BLACK, ExportFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&encoded.bytes).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(encoded.format.mime_type(), "image/jpeg");
        assert_eq!(encoded.format.extension(), "jpg");
    }
}
