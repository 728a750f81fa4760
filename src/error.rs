use image::ImageError;

/// Error type shared by the loader, surface, exporter and CLI.
///
/// None of these are fatal to the GUI: the app logs them and, where the user
/// triggered the action, shows an alert.
#[derive(Debug)]
pub enum StudioError {
    /// Upload is not a PNG or JPEG. Carries a short description of what was seen.
    InvalidFileType(String),
    /// Decoded image has no pixels on at least one axis.
    EmptyImage { width: u32, height: u32 },
    /// Bytes claimed a supported format but failed to decode.
    Decode(String),
    /// Drawing surface could not be constructed.
    CanvasInit(String),
    /// Flattening or encoding the surface failed.
    MaskGeneration(String),
    /// Download requested before any mask exists.
    MaskNotGenerated,
    /// Stroke script could not be read or parsed.
    Script(String),
    Io(std::io::Error),
}

impl StudioError {
    /// Message shown to the user in an alert window.
    pub fn user_message(&self) -> String {
        if self.is_upload_rejection() {
            return "Please upload a valid image file.".to_string();
        }
        match self {
            StudioError::MaskNotGenerated => "Please generate a mask first.".to_string(),
            other => other.to_string(),
        }
    }

    /// True for the errors that reject an upload without touching state.
    pub fn is_upload_rejection(&self) -> bool {
        matches!(
            self,
            StudioError::InvalidFileType(_) | StudioError::EmptyImage { .. } | StudioError::Decode(_)
        )
    }
}

impl std::fmt::Display for StudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StudioError::InvalidFileType(seen) => {
                write!(f, "Invalid file type: {} (expected PNG or JPEG)", seen)
            }
            StudioError::EmptyImage { width, height } => {
                write!(f, "Image has zero area ({}x{})", width, height)
            }
            StudioError::Decode(e) => write!(f, "Decode error: {}", e),
            StudioError::CanvasInit(e) => write!(f, "Canvas initialization failed: {}", e),
            StudioError::MaskGeneration(e) => write!(f, "Mask generation failed: {}", e),
            StudioError::MaskNotGenerated => write!(f, "No mask has been generated yet"),
            StudioError::Script(e) => write!(f, "Stroke script error: {}", e),
            StudioError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StudioError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StudioError {
    fn from(e: std::io::Error) -> Self {
        StudioError::Io(e)
    }
}

impl From<ImageError> for StudioError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => StudioError::Io(io),
            ImageError::Unsupported(u) => StudioError::InvalidFileType(u.to_string()),
            other => StudioError::Decode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::Script(e.to_string())
    }
}

pub type StudioResult<T> = Result<T, StudioError>;
