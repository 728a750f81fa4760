//! Upload validation, background decoding, and mask file output.

use image::{ImageFormat, RgbaImage};
use rfd::FileDialog;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::error::{StudioError, StudioResult};
use crate::fit::SourceImage;
use crate::mask::{MASK_FORMAT, MaskResult};

/// Upload types the tool accepts.
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg];
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A decoded upload.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub pixels: RgbaImage,
    pub source: SourceImage,
    pub format: ImageFormat,
    pub path: Option<PathBuf>,
}

impl LoadedImage {
    pub fn mime_type(&self) -> &'static str {
        mime_type(self.format)
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

pub fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn format_from_extension(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

/// Identify the upload from its leading bytes. Only PNG and JPEG pass.
pub fn detect_format(bytes: &[u8]) -> StudioResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(format),
        Ok(other) => Err(StudioError::InvalidFileType(format!("{:?}", other))),
        Err(_) => Err(StudioError::InvalidFileType("unrecognised data".to_string())),
    }
}

/// Validate and decode an upload. `path` is only used for the extension
/// cross-check and for display.
///
/// The contents decide the format; an extension that disagrees is logged but
/// does not reject the file. No size limit is applied.
pub fn decode_upload(bytes: &[u8], path: Option<&Path>) -> StudioResult<LoadedImage> {
    let format = detect_format(bytes)?;

    if let Some(p) = path
        && let Some(claimed) = format_from_extension(p)
        && claimed != format
    {
        log_warn!(
            "{} is named as {} but contains {}",
            p.display(),
            mime_type(claimed),
            mime_type(format)
        );
    }

    // Bytes are already in memory, so any failure here is a bad file.
    let pixels = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| StudioError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = pixels.dimensions();
    let source = SourceImage::new(width, height)?;

    Ok(LoadedImage {
        pixels,
        source,
        format,
        path: path.map(Path::to_path_buf),
    })
}

/// Read and decode an image on the current thread (CLI / tests).
pub fn load_image_sync(path: &Path) -> StudioResult<LoadedImage> {
    let bytes = std::fs::read(path)?;
    decode_upload(&bytes, Some(path))
}

// ============================================================================
// ASYNC UPLOAD
// ============================================================================

/// Result of one background upload. `generation` identifies the upload; the
/// receiver drops outcomes older than the newest upload it started.
pub struct UploadOutcome {
    pub generation: u64,
    pub path: PathBuf,
    pub result: StudioResult<LoadedImage>,
}

/// Decode `path` on the rayon pool and deliver exactly one [`UploadOutcome`].
pub fn spawn_upload(path: PathBuf, generation: u64, sender: mpsc::Sender<UploadOutcome>) {
    rayon::spawn(move || {
        let result = load_image_sync(&path);
        // Receiver gone means the app is shutting down.
        let _ = sender.send(UploadOutcome {
            generation,
            path,
            result,
        });
    });
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Write the encoded mask bytes unchanged.
pub fn write_mask(mask: &MaskResult, path: &Path) -> StudioResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(mask.bytes())?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// NATIVE DIALOGS
// ============================================================================

/// Native open dialog filtered to PNG / JPEG.
pub fn pick_image_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Images (PNG, JPG)", ACCEPTED_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Native save dialog pre-filled with `default_name`.
pub fn pick_mask_save_path(default_name: &str) -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PNG Image", &[MASK_FORMAT.extension()])
        .set_file_name(default_name)
        .save_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ExportFormat, encode};
    use image::Rgba;

    fn encoded(format: ExportFormat, w: u32, h: u32) -> Vec<u8> {
        encode(&RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])), format).unwrap()
    }

    #[test]
    fn test_png_and_jpeg_accepted() {
        let png = decode_upload(&encoded(ExportFormat::Png, 7, 5), None).unwrap();
        assert_eq!(png.source, SourceImage { width: 7, height: 5 });
        assert_eq!(png.mime_type(), "image/png");

        let jpg = decode_upload(&encoded(ExportFormat::Jpeg, 16, 8), None).unwrap();
        assert_eq!(jpg.format, ImageFormat::Jpeg);
        assert_eq!(jpg.source, SourceImage { width: 16, height: 8 });
    }

    #[test]
    fn test_other_types_rejected() {
        // GIF header
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        assert!(matches!(
            decode_upload(gif, None),
            Err(StudioError::InvalidFileType(_))
        ));
        assert!(matches!(
            decode_upload(b"hello, not an image", None),
            Err(StudioError::InvalidFileType(_))
        ));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let mut bytes = encoded(ExportFormat::Png, 32, 32);
        bytes.truncate(40);
        let err = decode_upload(&bytes, None).unwrap_err();
        assert!(matches!(err, StudioError::Decode(_)), "{:?}", err);
        assert!(err.is_upload_rejection());
        assert_eq!(err.user_message(), "Please upload a valid image file.");
    }

    #[test]
    fn test_mismatched_extension_still_loads() {
        let bytes = encoded(ExportFormat::Png, 4, 4);
        let img = decode_upload(&bytes, Some(Path::new("photo.jpg"))).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!(img.display_name(), "photo.jpg");
    }

    #[test]
    fn test_spawn_upload_reports_once() {
        let dir = std::env::temp_dir().join(format!("mask-studio-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("upload.png");
        std::fs::write(&path, encoded(ExportFormat::Png, 3, 2)).unwrap();

        let (tx, rx) = mpsc::channel();
        spawn_upload(path.clone(), 42, tx);
        let outcome = rx.recv().unwrap();
        assert_eq!(outcome.generation, 42);
        assert_eq!(outcome.path, path);
        assert_eq!(outcome.result.unwrap().source, SourceImage { width: 3, height: 2 });
        // Sender was moved into the task and dropped after one send.
        assert!(rx.recv().is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_image_sync(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, StudioError::Io(_)));
    }
}
