//! Mask export and its lifecycle.
//!
//! A mask is the surface flattened over black and encoded as PNG, nothing
//! more. Anti-aliased stroke edges stay grey: no thresholding is applied, so
//! the result is not strictly binary.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::brush::BrushColor;
use crate::error::{StudioError, StudioResult};
use crate::surface::{DrawingSurface, EncodedImage, ExportFormat};

pub const MASK_BACKGROUND: BrushColor = BrushColor::BLACK;
pub const MASK_FORMAT: ExportFormat = ExportFormat::Png;

/// Where the session is in the upload → paint → export cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportPhase {
    /// Background (or none) loaded, no mask generated since the last reset.
    #[default]
    Empty,
    /// Strokes are being issued.
    Drawing,
    /// A mask exists and can be downloaded.
    MaskReady,
}

impl ExportPhase {
    pub fn on_stroke(self) -> Self {
        ExportPhase::Drawing
    }

    pub fn on_mask_generated(self) -> Self {
        ExportPhase::MaskReady
    }

    /// Clear or new upload.
    pub fn on_reset(self) -> Self {
        ExportPhase::Empty
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportPhase::Empty => "Empty",
            ExportPhase::Drawing => "Drawing",
            ExportPhase::MaskReady => "Mask ready",
        }
    }
}

/// An exported mask, kept in memory until replaced, cleared or downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskResult {
    pub image: EncodedImage,
}

impl MaskResult {
    pub fn bytes(&self) -> &[u8] {
        &self.image.bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    /// Decode back to pixels for on-screen preview.
    pub fn decode_preview(&self) -> StudioResult<RgbaImage> {
        Ok(image::load_from_memory(&self.image.bytes)?.to_rgba8())
    }
}

/// Flatten `surface` over black, PNG-encode, and hand the bytes back as-is.
pub fn generate_mask<S: DrawingSurface + ?Sized>(surface: &S) -> StudioResult<MaskResult> {
    generate_mask_over(surface, MASK_BACKGROUND)
}

/// [`generate_mask`] with a configurable fill behind the strokes.
pub fn generate_mask_over<S: DrawingSurface + ?Sized>(
    surface: &S,
    background: BrushColor,
) -> StudioResult<MaskResult> {
    let image = surface
        .export_to_image(background, MASK_FORMAT)
        .map_err(|e| match e {
            StudioError::MaskGeneration(_) => e,
            other => StudioError::MaskGeneration(other.to_string()),
        })?;
    Ok(MaskResult { image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{BrushKind, StrokePoint};
    use crate::fit::CanvasDimensions;
    use crate::surface::RasterSurface;

    fn surface() -> RasterSurface {
        RasterSurface::new(CanvasDimensions { width: 30, height: 20 }, 5).unwrap()
    }

    #[test]
    fn test_phase_transitions() {
        let phase = ExportPhase::default();
        assert_eq!(phase, ExportPhase::Empty);
        let phase = phase.on_stroke();
        assert_eq!(phase, ExportPhase::Drawing);
        let phase = phase.on_mask_generated();
        assert_eq!(phase, ExportPhase::MaskReady);
        assert_eq!(phase.on_stroke(), ExportPhase::Drawing);
        assert_eq!(phase.on_reset(), ExportPhase::Empty);
    }

    #[test]
    fn test_empty_mask_is_black_png() {
        let mask = generate_mask(&surface()).unwrap();
        assert_eq!(image::guess_format(mask.bytes()).unwrap(), image::ImageFormat::Png);
        assert_eq!(mask.dimensions(), (30, 20));
        let pixels = mask.decode_preview().unwrap();
        assert!(pixels.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_mask_keeps_stroke_color_and_soft_edges() {
        let mut s = surface();
        s.configure_brush(BrushKind::Pen, 9, BrushColor([255, 0, 0]));
        s.begin_stroke(StrokePoint::new(15.0, 10.0));
        s.end_stroke();
        let pixels = generate_mask(&s).unwrap().decode_preview().unwrap();
        assert_eq!(pixels.get_pixel(15, 10).0, [255, 0, 0, 255]);
        let grey_edge = pixels
            .pixels()
            .any(|p| p.0[0] > 0 && p.0[0] < 255 && p.0[1] == 0);
        assert!(grey_edge, "anti-aliased edge pixels are expected");
    }

    #[test]
    fn test_mask_through_trait_object() {
        let s = surface();
        let dyn_surface: &dyn DrawingSurface = &s;
        assert!(generate_mask(dyn_surface).is_ok());
    }
}
