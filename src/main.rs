// GUI by default; `--input` / `-i` switches to headless replay before any
// window is created.

use eframe::egui;
use maskstudio::app::MaskStudioApp;
use maskstudio::cli;
use maskstudio::logger;
use maskstudio::StudioConfig;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        logger::init_headless();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 900.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Image Masking Studio"),
        ..Default::default()
    };

    eframe::run_native(
        "Image Masking Studio",
        options,
        Box::new(|cc| Box::new(MaskStudioApp::new(cc, StudioConfig::default()))),
    )
}
