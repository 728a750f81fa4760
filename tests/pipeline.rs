//! Upload → paint → generate → download through the public library API.

use std::path::PathBuf;
use std::sync::mpsc;

use image::{Rgba, RgbaImage};
use maskstudio::brush::{BrushColor, BrushKind, StrokePoint};
use maskstudio::cli::{load_strokes, replay};
use maskstudio::fit::CanvasDimensions;
use maskstudio::loader::{load_image_sync, spawn_upload};
use maskstudio::mask::ExportPhase;
use maskstudio::surface::{ExportFormat, encode};
use maskstudio::{MaskSession, StudioConfig, StudioError};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mask-studio-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_picture(path: &PathBuf, w: u32, h: u32, format: ExportFormat) {
    let img = RgbaImage::from_pixel(w, h, Rgba([30, 90, 160, 255]));
    std::fs::write(path, encode(&img, format).unwrap()).unwrap();
}

#[test]
fn test_full_session_round_trip() {
    let dir = scratch_dir("pipeline");
    let input = dir.join("photo.png");
    write_picture(&input, 1600, 1200, ExportFormat::Png);

    let mut session = MaskSession::new(StudioConfig::default());
    let (tx, rx) = mpsc::channel();
    let generation = session.begin_upload();
    spawn_upload(input.clone(), generation, tx);
    assert!(session.finish_upload(rx.recv().unwrap()).unwrap());
    assert_eq!(session.state().canvas, CanvasDimensions { width: 800, height: 600 });

    session.set_brush_kind(BrushKind::Pen);
    session.set_brush_size(30);
    session.begin_stroke(StrokePoint::new(100.0, 300.0));
    session.extend_stroke(StrokePoint::new(400.0, 300.0));
    session.extend_stroke(StrokePoint::new(700.0, 300.0));
    session.end_stroke();

    session.generate_mask().unwrap();
    assert_eq!(session.state().phase, ExportPhase::MaskReady);

    let output = dir.join("mask.png");
    session.download_mask(&output).unwrap();

    let mask = image::open(&output).unwrap().to_rgba8();
    assert_eq!(mask.dimensions(), (800, 600));
    assert_eq!(mask.get_pixel(400, 300).0, [255, 255, 255, 255]);
    // The photo itself never reaches the mask
    assert_eq!(mask.get_pixel(400, 50).0, [0, 0, 0, 255]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_rejected_upload_then_valid_jpeg() {
    let dir = scratch_dir("reject");
    let bogus = dir.join("notes.png");
    std::fs::write(&bogus, b"definitely not pixels").unwrap();
    let jpeg = dir.join("portrait.jpg");
    write_picture(&jpeg, 1080, 1920, ExportFormat::Jpeg);

    let mut session = MaskSession::new(StudioConfig::default());
    let err = load_image_sync(&bogus).unwrap_err();
    assert!(err.is_upload_rejection());
    assert_eq!(err.user_message(), "Please upload a valid image file.");

    session.load_image(load_image_sync(&jpeg).unwrap()).unwrap();
    assert_eq!(session.state().canvas, CanvasDimensions { width: 338, height: 600 });

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_scripted_strokes_with_clear() {
    let dir = scratch_dir("script");
    let script = dir.join("strokes.json");
    std::fs::write(
        &script,
        r##"[{"kind": "circle", "size": 10, "color": "#00FF00", "points": [[50, 50], [60, 50]]}]"##,
    )
    .unwrap();
    let input = dir.join("small.png");
    write_picture(&input, 100, 100, ExportFormat::Png);

    let mut session = MaskSession::new(StudioConfig::default());
    session.load_image(load_image_sync(&input).unwrap()).unwrap();
    replay(&mut session, &load_strokes(&script).unwrap());
    assert!(!session.surface().unwrap().strokes_empty());

    session.generate_mask().unwrap();
    session.clear();
    assert!(matches!(
        session.download_mask(&dir.join("unused.png")),
        Err(StudioError::MaskNotGenerated)
    ));
    // The last scripted brush stays selected
    assert_eq!(session.state().brush.kind, BrushKind::Circle);
    assert_eq!(session.state().brush.color, BrushColor([0, 255, 0]));

    let _ = std::fs::remove_dir_all(&dir);
}
