// ============================================================================
// Mask Studio CLI: headless stroke replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   mask-studio --input photo.png --strokes strokes.json --output mask.png
//   mask-studio -i photo.jpg                            (blank mask at fitted size)
//   mask-studio -i photo.png --strokes s.json --brush-kind spray --seed 7
//
// Stroke script format:
//   [
//     { "kind": "pen", "size": 12, "color": "#FFFFFF", "points": [[10, 10], [80, 40]] },
//     { "points": [[5, 5]] }
//   ]
// Fields other than `points` fall back to the command-line brush.
//
// No window is opened. Everything runs on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::brush::{BrushColor, BrushConfig, BrushKind, StrokePoint};
use crate::config::{DEFAULT_MASK_FILE_NAME, StudioConfig};
use crate::error::{StudioError, StudioResult};
use crate::fit::CanvasBounds;
use crate::loader::load_image_sync;
use crate::logger;
use crate::session::MaskSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Image Masking Studio headless mask generator.
#[derive(Parser, Debug)]
#[command(
    name = "mask-studio",
    about = "Image Masking Studio headless mask generator",
    long_about = "Load a PNG or JPEG, replay brush strokes from a JSON script and write\n\
                  the resulting mask without opening the GUI.\n\n\
                  Example:\n  \
                  mask-studio --input photo.png --strokes strokes.json --output mask.png"
)]
pub struct CliArgs {
    /// Image to mask (PNG or JPEG).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// JSON stroke script. Without it the mask is blank.
    #[arg(short, long, value_name = "STROKES.json")]
    pub strokes: Option<PathBuf>,

    /// Where to write the mask.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_MASK_FILE_NAME)]
    pub output: PathBuf,

    /// Canvas width limit in pixels.
    #[arg(long, default_value_t = CanvasBounds::default().max_width)]
    pub max_width: u32,

    /// Canvas height limit in pixels.
    #[arg(long, default_value_t = CanvasBounds::default().max_height)]
    pub max_height: u32,

    /// Default brush size for strokes that do not set one (1–50).
    #[arg(long, value_name = "1-50")]
    pub brush_size: Option<u32>,

    /// Default brush: pen, spray or circle.
    #[arg(long, value_name = "KIND")]
    pub brush_kind: Option<BrushKind>,

    /// Default brush color as #RRGGBB.
    #[arg(long, value_name = "#RRGGBB")]
    pub color: Option<String>,

    /// Flatten the picture into the mask instead of pure black.
    #[arg(long)]
    pub include_background: bool,

    /// Seed for the spray and circle brushes.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Echo log lines and timing to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when `--input` / `-i` (in any spelling clap accepts) is
    /// present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        requests_cli(std::env::args().skip(1))
    }

    /// Runtime configuration with the command-line overrides applied.
    pub fn to_config(&self) -> StudioResult<StudioConfig> {
        let mut config = StudioConfig {
            bounds: CanvasBounds {
                max_width: self.max_width,
                max_height: self.max_height,
            },
            include_background: self.include_background,
            ..StudioConfig::default()
        };
        let brush = config.default_brush;
        let color = match &self.color {
            Some(hex) => parse_color(hex)?,
            None => brush.color,
        };
        config.default_brush = BrushConfig::new(
            self.brush_kind.unwrap_or(brush.kind),
            self.brush_size.unwrap_or(brush.size),
            color,
        );
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

/// `--input`, `--input=FILE`, `-i`, `-iFILE` and `-i=FILE` all select the CLI.
fn requests_cli<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().any(|a| {
        let a = a.as_ref();
        a == "--input" || a.starts_with("--input=") || (a.starts_with("-i") && !a.starts_with("--"))
    })
}

// ============================================================================
// Stroke script
// ============================================================================

/// One scripted stroke. Missing fields use the current brush.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptedStroke {
    #[serde(default)]
    pub kind: Option<BrushKind>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub color: Option<BrushColor>,
    pub points: Vec<StrokePoint>,
}

pub fn parse_strokes(source: &str) -> StudioResult<Vec<ScriptedStroke>> {
    Ok(serde_json::from_str(source)?)
}

pub fn load_strokes(path: &Path) -> StudioResult<Vec<ScriptedStroke>> {
    let source = std::fs::read_to_string(path)?;
    parse_strokes(&source)
}

fn parse_color(hex: &str) -> StudioResult<BrushColor> {
    BrushColor::from_hex(hex)
        .ok_or_else(|| StudioError::Script(format!("'{}' is not a #RRGGBB color", hex)))
}

/// Replay `strokes` on the session. Empty strokes are skipped.
pub fn replay(session: &mut MaskSession, strokes: &[ScriptedStroke]) {
    let defaults = session.state().brush;
    for stroke in strokes {
        let Some((first, rest)) = stroke.points.split_first() else {
            continue;
        };
        session.set_brush_kind(stroke.kind.unwrap_or(defaults.kind));
        session.set_brush_size(stroke.size.unwrap_or(defaults.size));
        session.pick_custom_color(stroke.color.unwrap_or(defaults.color));

        session.begin_stroke(*first);
        for p in rest {
            session.extend_stroke(*p);
        }
        session.end_stroke();
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the headless pipeline and return an OS exit code.
/// `0` = mask written, `1` = any failure.
pub fn run(args: CliArgs) -> ExitCode {
    logger::set_echo_stderr(args.verbose);
    let start = Instant::now();

    match run_inner(&args) {
        Ok((width, height)) => {
            if args.verbose {
                println!(
                    "  → {} ({}x{}, {:.0}ms)",
                    args.output.display(),
                    width,
                    height,
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("CLI run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_inner(args: &CliArgs) -> StudioResult<(u32, u32)> {
    let config = args.to_config()?;
    let strokes = match &args.strokes {
        Some(path) => load_strokes(path)?,
        None => Vec::new(),
    };
    let image = load_image_sync(&args.input)?;

    let mut session = MaskSession::new(config);
    session.load_image(image)?;
    if !session.canvas_ready() {
        return Err(StudioError::CanvasInit(
            "drawing surface could not be created".to_string(),
        ));
    }
    replay(&mut session, &strokes);

    let dims = session.generate_mask()?.dimensions();
    session.download_mask(&args.output)?;
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("mask-studio").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-i", "photo.png"]);
        assert_eq!(args.output, PathBuf::from("mask.png"));
        let config = args.to_config().unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn test_overrides_reach_config() {
        let args = parse(&[
            "--input", "p.jpg", "--max-width", "100", "--max-height", "50",
            "--brush-size", "80", "--brush-kind", "spray", "--color", "#00ff00",
            "--include-background", "--seed", "3",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.bounds, CanvasBounds { max_width: 100, max_height: 50 });
        assert_eq!(config.default_brush.size, 50);
        assert_eq!(config.default_brush.kind, BrushKind::Spray);
        assert_eq!(config.default_brush.color, BrushColor([0, 255, 0]));
        assert!(config.include_background);
        assert_eq!(config.seed, 3);
    }

    #[test]
    fn test_bad_color_is_script_error() {
        let args = parse(&["-i", "p.png", "--color", "green"]);
        assert!(matches!(args.to_config(), Err(StudioError::Script(_))));
    }

    #[test]
    fn test_cli_routing_accepts_every_input_spelling() {
        for args in [
            vec!["--input", "photo.png"],
            vec!["--input=photo.png"],
            vec!["-i", "photo.png"],
            vec!["-iphoto.png"],
            vec!["-v", "-i=photo.png"],
        ] {
            assert!(requests_cli(&args), "{:?}", args);
            assert!(CliArgs::try_parse_from(std::iter::once("mask-studio").chain(args)).is_ok());
        }
        assert!(!requests_cli(Vec::<String>::new()));
        assert!(!requests_cli(["--verbose", "--inputs"]));
    }

    #[test]
    fn test_input_required() {
        assert!(CliArgs::try_parse_from(["mask-studio", "--output", "m.png"]).is_err());
    }

    #[test]
    fn test_parse_stroke_script() {
        let strokes = parse_strokes(
            r##"[
                {"kind": "circle", "size": 12, "color": "#FF0000", "points": [[1, 2], [3.5, 4]]},
                {"points": []}
            ]"##,
        )
        .unwrap();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].kind, Some(BrushKind::Circle));
        assert_eq!(strokes[0].color, Some(BrushColor([255, 0, 0])));
        assert_eq!(strokes[0].points[1], StrokePoint::new(3.5, 4.0));
        assert_eq!(strokes[1].size, None);
    }

    #[test]
    fn test_malformed_script_rejected() {
        assert!(matches!(parse_strokes("{\"points\": 3}"), Err(StudioError::Script(_))));
        assert!(matches!(
            parse_strokes(r#"[{"color": "nope", "points": []}]"#),
            Err(StudioError::Script(_))
        ));
    }

    #[test]
    fn test_replay_paints_and_restores_defaults() {
        let mut session = MaskSession::new(StudioConfig {
            bounds: CanvasBounds { max_width: 40, max_height: 40 },
            ..StudioConfig::default()
        });
        let strokes = vec![
            ScriptedStroke {
                kind: Some(BrushKind::Pen),
                size: Some(6),
                color: Some(BrushColor([255, 0, 0])),
                points: vec![StrokePoint::new(5.0, 20.0), StrokePoint::new(35.0, 20.0)],
            },
            ScriptedStroke {
                kind: None,
                size: None,
                color: None,
                points: vec![StrokePoint::new(20.0, 5.0)],
            },
        ];
        replay(&mut session, &strokes);
        assert_eq!(session.state().brush, BrushConfig::default());

        session.generate_mask().unwrap();
        let pixels = session.mask().unwrap().decode_preview().unwrap();
        assert_eq!(pixels.get_pixel(20, 20).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(20, 5).0, [255, 255, 255, 255]);
    }
}
