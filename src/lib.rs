//! screen_qr - multi-engine QR decoding for on-screen codes
//!
//! A frame captured from the screen goes through a ranked set of decoding
//! engines, then through a sequence of preprocessing transforms, rescales and
//! finally a tiled scan, stopping at the first decoded code. A monitor
//! session repeats this against one window on a timer and reports only codes
//! that changed.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Capture, selection and result-sink collaborator interfaces
pub mod capture;
/// TOML configuration with defaults for every field
pub mod config;
/// Decoding engines (neural, geometric, linear) and the ranked engine set
pub mod engine;
/// Error types
pub mod error;
/// Perspective mapping between image and module space
pub mod geometry;
/// Core data structures (Frame, Region, BitMatrix, DetectionResult, etc.)
pub mod models;
/// Polling window monitor with change-only emission
pub mod monitor;
/// Ordered engine x transform x tile search
pub mod pipeline;
/// Full-screen, region and manual scan entry points
pub mod scan;
/// QR symbol reading: format, masking, Reed-Solomon, payload
pub mod symbol;
/// Pure frame-to-frame preprocessing transforms
pub mod transform;

pub use capture::{
    ChannelSink, ImageFileCapture, NotifyingSink, ResultSink, ScreenCapture, SelectionOverlay,
    WindowId,
};
pub use config::Config;
pub use engine::{Backend, EngineDescriptor, EngineSet};
pub use error::{
    CaptureError, ConfigError, EngineError, FrameError, MonitorError, ScanError, SymbolError,
};
pub use models::{BitMatrix, DetectionResult, EngineKind, Frame, PixelFormat, Point, Region, Stage};
pub use monitor::MonitorSession;
pub use pipeline::{Detect, Pipeline, PipelineTrace};
pub use scan::{ScanOutcome, Scanner};
pub use transform::TransformKind;

/// Detect a QR code in an RGB image with the standard engines and defaults
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// The first decoded code, or `None`
pub fn detect(
    image: &[u8],
    width: usize,
    height: usize,
) -> Result<Option<DetectionResult>, FrameError> {
    let frame = Frame::from_rgb(width, height, image.to_vec())?;
    Pipeline::standard().detect(&frame)
}
