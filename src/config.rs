use serde::{Deserialize, Serialize};

use crate::brush::{BrushColor, BrushConfig};
use crate::fit::CanvasBounds;

/// Name offered for the downloaded mask.
pub const DEFAULT_MASK_FILE_NAME: &str = "mask.png";
/// Shown under the upload area. The limit it names is not enforced.
pub const UPLOAD_HINT: &str = "PNG, JPG up to 10MB";
pub const DEFAULT_SEED: u64 = 0x6d61_736b;

/// Runtime configuration. Built from defaults and overridden from the command
/// line; nothing here is written to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    pub bounds: CanvasBounds,
    /// Brush in effect when the app starts.
    pub default_brush: BrushConfig,
    /// Fill behind the strokes in the exported mask.
    pub mask_background: BrushColor,
    pub mask_file_name: String,
    pub upload_hint: String,
    /// Also flatten the uploaded picture into the exported mask.
    pub include_background: bool,
    /// Seed for the spray / circle brushes.
    pub seed: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            bounds: CanvasBounds::default(),
            default_brush: BrushConfig::default(),
            mask_background: BrushColor::BLACK,
            mask_file_name: DEFAULT_MASK_FILE_NAME.to_string(),
            upload_hint: UPLOAD_HINT.to_string(),
            include_background: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl StudioConfig {
    /// One-line summary for the session log.
    pub fn describe(&self) -> String {
        format!(
            "bounds={}x{} brush={} {}px {} mask_bg={} include_background={} seed={}",
            self.bounds.max_width,
            self.bounds.max_height,
            self.default_brush.kind.label(),
            self.default_brush.size,
            self.default_brush.color.to_hex(),
            self.mask_background.to_hex(),
            self.include_background,
            self.seed,
        )
    }
}
