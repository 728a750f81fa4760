//! Image Masking Studio: paint over a picture and export the strokes as a
//! mask image.

#[macro_use]
pub mod logger;

pub mod app;
pub mod brush;
pub mod cli;
pub mod config;
pub mod error;
pub mod fit;
pub mod loader;
pub mod mask;
pub mod raster;
pub mod session;
pub mod state;
pub mod surface;

pub use config::StudioConfig;
pub use error::{StudioError, StudioResult};
pub use session::MaskSession;
