//! Scale-to-bounds fitting for uploaded images.
//!
//! An uploaded picture is shrunk (never enlarged) so that it fits inside the
//! canvas bounds while keeping its aspect ratio. The same scale is then used to
//! place the picture at the top-left corner of the drawing surface.

use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};

/// Default maximum canvas width in pixels.
pub const MAX_CANVAS_WIDTH: u32 = 800;
/// Default maximum canvas height in pixels.
pub const MAX_CANVAS_HEIGHT: u32 = 600;

/// Raw pixel dimensions of an uploaded picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
}

impl SourceImage {
    /// Rejects zero-area images.
    pub fn new(width: u32, height: u32) -> StudioResult<Self> {
        if width == 0 || height == 0 {
            return Err(StudioError::EmptyImage { width, height });
        }
        Ok(Self { width, height })
    }
}

/// Upper limits for the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            max_width: MAX_CANVAS_WIDTH,
            max_height: MAX_CANVAS_HEIGHT,
        }
    }
}

impl CanvasBounds {
    /// Canvas size used before any image is uploaded.
    pub fn full(&self) -> CanvasDimensions {
        CanvasDimensions {
            width: self.max_width,
            height: self.max_height,
        }
    }
}

/// Size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn fits_within(&self, bounds: &CanvasBounds) -> bool {
        self.width <= bounds.max_width && self.height <= bounds.max_height
    }
}

impl From<CanvasDimensions> for SourceImage {
    fn from(d: CanvasDimensions) -> Self {
        SourceImage {
            width: d.width,
            height: d.height,
        }
    }
}

/// `min(max_w / w, max_h / h, 1)`. Computed in f64 so that 32-bit sizes
/// round the same way a browser's double arithmetic would.
pub fn fit_scale(source: SourceImage, bounds: &CanvasBounds) -> f64 {
    let scale_x = bounds.max_width as f64 / source.width as f64;
    let scale_y = bounds.max_height as f64 / source.height as f64;
    scale_x.min(scale_y).min(1.0)
}

/// Fit `source` inside `bounds`, preserving aspect ratio and never upscaling.
///
/// Each axis is at least 1 px: a 10000×1 strip still yields a drawable canvas.
pub fn fit(source: SourceImage, bounds: &CanvasBounds) -> StudioResult<CanvasDimensions> {
    if source.width == 0 || source.height == 0 {
        return Err(StudioError::EmptyImage {
            width: source.width,
            height: source.height,
        });
    }
    if bounds.max_width == 0 || bounds.max_height == 0 {
        return Err(StudioError::CanvasInit(format!(
            "canvas bounds must be positive, got {}x{}",
            bounds.max_width, bounds.max_height
        )));
    }

    let scale = fit_scale(source, bounds);
    let width = round_half_up(source.width as f64 * scale).clamp(1, bounds.max_width);
    let height = round_half_up(source.height as f64 * scale).clamp(1, bounds.max_height);

    Ok(CanvasDimensions { width, height })
}

/// Scale used to composite the source onto an already-fitted canvas.
pub fn placement_scale(source: SourceImage, canvas: CanvasDimensions) -> f64 {
    let scale_x = canvas.width as f64 / source.width as f64;
    let scale_y = canvas.height as f64 / source.height as f64;
    scale_x.min(scale_y)
}

// `f64::round` rounds half away from zero; inputs here are never negative so
// it matches `Math.round`.
fn round_half_up(v: f64) -> u32 {
    v.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(w: u32, h: u32) -> SourceImage {
        SourceImage::new(w, h).unwrap()
    }

    #[test]
    fn test_fit_downscales_exact_ratio() {
        let dims = fit(src(1600, 1200), &CanvasBounds::default()).unwrap();
        assert_eq!(dims, CanvasDimensions { width: 800, height: 600 });
    }

    #[test]
    fn test_fit_never_upscales() {
        let dims = fit(src(400, 300), &CanvasBounds::default()).unwrap();
        assert_eq!(dims, CanvasDimensions { width: 400, height: 300 });
    }

    #[test]
    fn test_fit_within_bounds_is_identity() {
        let bounds = CanvasBounds::default();
        for (w, h) in [(1, 1), (800, 600), (799, 1), (1, 600), (640, 480), (123, 457)] {
            assert_eq!(
                fit(src(w, h), &bounds).unwrap(),
                CanvasDimensions { width: w, height: h }
            );
        }
    }

    #[test]
    fn test_fit_oversized_stays_in_bounds_and_keeps_ratio() {
        let bounds = CanvasBounds::default();
        for (w, h) in [(1920, 1080), (1080, 1920), (4000, 3001), (801, 600), (800, 601), (3, 5000)] {
            let dims = fit(src(w, h), &bounds).unwrap();
            assert!(dims.fits_within(&bounds), "{}x{} -> {:?}", w, h, dims);

            // Rounding moves each axis by at most half a pixel.
            let scale = fit_scale(src(w, h), &bounds);
            assert!((dims.width as f64 - w as f64 * scale).abs() <= 0.5 || dims.width == 1);
            assert!((dims.height as f64 - h as f64 * scale).abs() <= 0.5 || dims.height == 1);
        }
    }

    #[test]
    fn test_fit_landscape_limited_by_width() {
        let dims = fit(src(1920, 1080), &CanvasBounds::default()).unwrap();
        assert_eq!(dims, CanvasDimensions { width: 800, height: 450 });
    }

    #[test]
    fn test_fit_portrait_limited_by_height() {
        let dims = fit(src(1080, 1920), &CanvasBounds::default()).unwrap();
        assert_eq!(dims, CanvasDimensions { width: 338, height: 600 });
    }

    #[test]
    fn test_fit_is_idempotent() {
        let bounds = CanvasBounds::default();
        for (w, h) in [(1920, 1080), (5000, 17), (1234, 999), (400, 300)] {
            let once = fit(src(w, h), &bounds).unwrap();
            let twice = fit(once.into(), &bounds).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_fit_thin_strip_keeps_one_pixel() {
        let dims = fit(src(100_000, 1), &CanvasBounds::default()).unwrap();
        assert_eq!(dims, CanvasDimensions { width: 800, height: 1 });
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            SourceImage::new(0, 10),
            Err(StudioError::EmptyImage { width: 0, height: 10 })
        ));
        let raw = SourceImage { width: 10, height: 0 };
        assert!(fit(raw, &CanvasBounds::default()).is_err());
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let bounds = CanvasBounds { max_width: 0, max_height: 600 };
        assert!(matches!(fit(src(10, 10), &bounds), Err(StudioError::CanvasInit(_))));
    }

    #[test]
    fn test_placement_scale_matches_fit() {
        let source = src(1600, 1200);
        let canvas = fit(source, &CanvasBounds::default()).unwrap();
        assert!((placement_scale(source, canvas) - 0.5).abs() < 1e-9);
    }
}
