//! Serializable application state and the actions that update it.
//!
//! The state holds only plain data (dimensions, brush settings, lifecycle
//! phase). Pixels live in the drawing surface and the session.

use serde::{Deserialize, Serialize};

use crate::brush::{BrushColor, BrushConfig, BrushKind, PRESET_COLORS, clamp_size};
use crate::config::StudioConfig;
use crate::fit::{CanvasDimensions, SourceImage};
use crate::mask::ExportPhase;

/// Which swatch the brush color came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Index into [`PRESET_COLORS`].
    Preset(usize),
    Custom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudioState {
    /// Dimensions of the current upload, if any.
    pub source: Option<SourceImage>,
    pub canvas: CanvasDimensions,
    pub brush: BrushConfig,
    pub color_choice: ColorChoice,
    /// Last value of the custom picker, kept while a preset is active.
    pub custom_color: BrushColor,
    pub phase: ExportPhase,
    pub has_mask: bool,
    /// Generation of the most recently started upload.
    pub upload_generation: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StudioAction {
    UploadStarted,
    ImageLoaded {
        generation: u64,
        source: SourceImage,
        canvas: CanvasDimensions,
    },
    BrushSizeChanged(u32),
    BrushKindChanged(BrushKind),
    PresetColorSelected(usize),
    CustomColorPicked(BrushColor),
    StrokeStarted,
    MaskGenerated,
    /// Export failed; any earlier mask is discarded.
    MaskFailed,
    CanvasCleared,
}

impl StudioState {
    pub fn new(config: &StudioConfig) -> Self {
        let brush = config.default_brush;
        let color_choice = PRESET_COLORS
            .iter()
            .position(|c| *c == brush.color)
            .map(ColorChoice::Preset)
            .unwrap_or(ColorChoice::Custom);
        Self {
            source: None,
            canvas: config.bounds.full(),
            brush,
            color_choice,
            custom_color: if color_choice == ColorChoice::Custom {
                brush.color
            } else {
                BrushColor::WHITE
            },
            phase: ExportPhase::Empty,
            has_mask: false,
            upload_generation: 0,
        }
    }

    /// Apply one action. Returns `false` when the action was ignored (stale
    /// upload, unknown preset) and nothing changed.
    pub fn apply(&mut self, action: StudioAction) -> bool {
        match action {
            StudioAction::UploadStarted => {
                self.upload_generation += 1;
            }
            StudioAction::ImageLoaded {
                generation,
                source,
                canvas,
            } => {
                if generation != self.upload_generation {
                    return false;
                }
                self.source = Some(source);
                self.canvas = canvas;
                self.reset_export();
            }
            StudioAction::BrushSizeChanged(size) => {
                self.brush.size = clamp_size(size);
            }
            StudioAction::BrushKindChanged(kind) => {
                self.brush.kind = kind;
            }
            StudioAction::PresetColorSelected(index) => {
                let Some(color) = PRESET_COLORS.get(index) else {
                    return false;
                };
                self.brush.color = *color;
                self.color_choice = ColorChoice::Preset(index);
            }
            StudioAction::CustomColorPicked(color) => {
                self.custom_color = color;
                self.brush.color = color;
                self.color_choice = ColorChoice::Custom;
            }
            StudioAction::StrokeStarted => {
                self.phase = self.phase.on_stroke();
            }
            StudioAction::MaskGenerated => {
                self.phase = self.phase.on_mask_generated();
                self.has_mask = true;
            }
            StudioAction::MaskFailed => {
                self.has_mask = false;
            }
            StudioAction::CanvasCleared => {
                self.reset_export();
            }
        }
        true
    }

    fn reset_export(&mut self) {
        self.phase = self.phase.on_reset();
        self.has_mask = false;
    }

    pub fn is_custom_color(&self) -> bool {
        self.color_choice == ColorChoice::Custom
    }

    /// True when the preview pair (original + mask) should be shown.
    pub fn shows_preview(&self) -> bool {
        self.source.is_some() && self.has_mask
    }
}
