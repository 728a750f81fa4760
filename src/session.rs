//! One masking session: the current upload, its drawing surface, the brush,
//! and the last generated mask.
//!
//! Both front ends (GUI and headless CLI) drive the tool through
//! [`MaskSession`]; neither touches the surface directly.

use std::path::Path;

use crate::brush::{BrushColor, BrushKind, StrokePoint};
use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::fit::{CanvasDimensions, fit, placement_scale};
use crate::loader::{LoadedImage, UploadOutcome, write_mask};
use crate::mask::{MaskResult, generate_mask_over};
use crate::state::{StudioAction, StudioState};
use crate::surface::{DrawingSurface, RasterSurface};

pub struct MaskSession {
    config: StudioConfig,
    state: StudioState,
    /// `None` when the surface could not be created; the canvas then
    /// ignores input until the next successful upload.
    surface: Option<RasterSurface>,
    /// The upload at its original resolution.
    original: Option<LoadedImage>,
    mask: Option<MaskResult>,
}

impl MaskSession {
    pub fn new(config: StudioConfig) -> Self {
        let state = StudioState::new(&config);
        let surface = build_surface(state.canvas, &config);
        let mut session = Self {
            config,
            state,
            surface,
            original: None,
            mask: None,
        };
        session.sync_brush();
        log_info!("Session started: {}", session.config.describe());
        session
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn state(&self) -> &StudioState {
        &self.state
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    pub fn original(&self) -> Option<&LoadedImage> {
        self.original.as_ref()
    }

    pub fn mask(&self) -> Option<&MaskResult> {
        self.mask.as_ref()
    }

    pub fn canvas_ready(&self) -> bool {
        self.surface.is_some()
    }

    // ========================================================================
    // UPLOAD
    // ========================================================================

    /// Start a new upload and return its generation. Outcomes from earlier
    /// uploads are dropped from now on.
    pub fn begin_upload(&mut self) -> u64 {
        self.state.apply(StudioAction::UploadStarted);
        self.state.upload_generation
    }

    /// Apply the result of a background upload.
    ///
    /// Returns `Ok(false)` for a stale outcome. A failed upload is returned as
    /// the error and leaves the canvas, the original and the mask untouched.
    pub fn finish_upload(&mut self, outcome: UploadOutcome) -> StudioResult<bool> {
        if outcome.generation != self.state.upload_generation {
            log_info!(
                "Dropped stale upload {} (generation {}, current {})",
                outcome.path.display(),
                outcome.generation,
                self.state.upload_generation
            );
            return Ok(false);
        }
        match outcome.result {
            Ok(loaded) => {
                self.install(loaded, outcome.generation)?;
                Ok(true)
            }
            Err(e) => {
                log_err!("Upload of {} rejected: {}", outcome.path.display(), e);
                Err(e)
            }
        }
    }

    /// Load an already decoded image on the current thread.
    pub fn load_image(&mut self, loaded: LoadedImage) -> StudioResult<()> {
        let generation = self.begin_upload();
        self.install(loaded, generation)
    }

    fn install(&mut self, loaded: LoadedImage, generation: u64) -> StudioResult<()> {
        let canvas = fit(loaded.source, &self.config.bounds)?;
        let scale = placement_scale(loaded.source, canvas);

        // A fresh surface per upload: strokes from the previous picture go.
        self.surface = build_surface(canvas, &self.config);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_background_image(&loaded.pixels, scale, scale);
        }
        self.sync_brush();

        log_info!(
            "Loaded {} ({}x{}, {}) onto {}x{} canvas",
            loaded.display_name(),
            loaded.source.width,
            loaded.source.height,
            loaded.mime_type(),
            canvas.width,
            canvas.height
        );

        self.mask = None;
        self.state.apply(StudioAction::ImageLoaded {
            generation,
            source: loaded.source,
            canvas,
        });
        self.original = Some(loaded);
        Ok(())
    }

    // ========================================================================
    // BRUSH
    // ========================================================================

    pub fn set_brush_size(&mut self, size: u32) {
        if self.state.apply(StudioAction::BrushSizeChanged(size)) {
            self.sync_brush();
        }
    }

    pub fn set_brush_kind(&mut self, kind: BrushKind) {
        if self.state.apply(StudioAction::BrushKindChanged(kind)) {
            self.sync_brush();
        }
    }

    /// Returns `false` for an index outside the preset palette.
    pub fn select_preset(&mut self, index: usize) -> bool {
        let applied = self.state.apply(StudioAction::PresetColorSelected(index));
        if applied {
            self.sync_brush();
        }
        applied
    }

    pub fn pick_custom_color(&mut self, color: BrushColor) {
        if self.state.apply(StudioAction::CustomColorPicked(color)) {
            self.sync_brush();
        }
    }

    fn sync_brush(&mut self) {
        let brush = self.state.brush;
        if let Some(surface) = self.surface.as_mut() {
            surface.configure_brush(brush.kind, brush.size, brush.color);
        }
    }

    // ========================================================================
    // STROKES
    // ========================================================================

    pub fn begin_stroke(&mut self, p: StrokePoint) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.begin_stroke(p);
        self.state.apply(StudioAction::StrokeStarted);
    }

    pub fn extend_stroke(&mut self, p: StrokePoint) {
        if let Some(surface) = self.surface.as_mut() {
            surface.extend_stroke(p);
        }
    }

    pub fn end_stroke(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.end_stroke();
        }
    }

    // ========================================================================
    // MASK
    // ========================================================================

    /// Export the current surface as the mask. On failure no mask remains, so
    /// a later download reports [`StudioError::MaskNotGenerated`].
    pub fn generate_mask(&mut self) -> StudioResult<&MaskResult> {
        let result = match self.surface.as_ref() {
            Some(surface) => generate_mask_over(surface, self.config.mask_background),
            None => Err(StudioError::MaskGeneration(
                "canvas is not available".to_string(),
            )),
        };
        match result {
            Ok(mask) => {
                let (w, h) = mask.dimensions();
                log_info!(
                    "Generated {}x{} {} mask ({} bytes)",
                    w,
                    h,
                    mask.image.format.mime_type(),
                    mask.bytes().len()
                );
                self.state.apply(StudioAction::MaskGenerated);
                Ok(self.mask.insert(mask))
            }
            Err(e) => {
                log_err!("Mask generation failed: {}", e);
                self.mask = None;
                self.state.apply(StudioAction::MaskFailed);
                Err(e)
            }
        }
    }

    /// Remove every stroke and the mask, then put the uploaded picture back.
    pub fn clear(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
            if let Some(original) = &self.original {
                let scale = placement_scale(original.source, surface.dimensions());
                surface.set_background_image(&original.pixels, scale, scale);
            }
        }
        self.mask = None;
        self.state.apply(StudioAction::CanvasCleared);
        log_info!("Canvas cleared");
    }

    /// Write the last generated mask to `path`.
    pub fn download_mask(&self, path: &Path) -> StudioResult<()> {
        let mask = self.mask.as_ref().ok_or(StudioError::MaskNotGenerated)?;
        write_mask(mask, path)?;
        log_info!("Mask saved to {}", path.display());
        Ok(())
    }
}

fn build_surface(dims: CanvasDimensions, config: &StudioConfig) -> Option<RasterSurface> {
    match RasterSurface::new(dims, config.seed) {
        Ok(mut surface) => {
            surface.set_export_background_image(config.include_background);
            Some(surface)
        }
        Err(e) => {
            log_err!("Canvas unavailable: {}", e);
            None
        }
    }
}
