//! Error types, one enum per concern
//!
//! "No code found" is never an error: the pipeline reports it as `Ok(None)`.

use crate::models::EngineKind;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed frame or invalid transform parameter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Pixel buffer is empty
    #[error("frame buffer is empty")]
    Empty,
    /// Width or height is zero
    #[error("frame has zero dimension ({width}x{height})")]
    ZeroDimension {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Buffer length does not match width * height * channels
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },
    /// Crop rectangle reaches outside the frame
    #[error("crop {x},{y} {width}x{height} is outside a {frame_width}x{frame_height} frame")]
    OutOfBounds {
        /// Crop left edge
        x: usize,
        /// Crop top edge
        y: usize,
        /// Crop width
        width: usize,
        /// Crop height
        height: usize,
        /// Source frame width
        frame_width: usize,
        /// Source frame height
        frame_height: usize,
    },
    /// Transform parameter outside its valid range
    #[error("invalid transform parameter: {0}")]
    InvalidParameter(String),
}

/// Sampled module grid could not be read as a QR symbol
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// Grid is not square or not 17 + 4 * version modules wide
    #[error("grid {width}x{height} is not a valid symbol size")]
    InvalidDimension {
        /// Grid width in modules
        width: usize,
        /// Grid height in modules
        height: usize,
    },
    /// Neither copy of the format information is within correction distance
    #[error("format information unreadable")]
    FormatUnreadable,
    /// Version information disagrees with the grid size
    #[error("version information says {found}, grid size implies {expected}")]
    VersionMismatch {
        /// Version implied by the grid dimension
        expected: u8,
        /// Version read from the symbol
        found: u8,
    },
    /// A block has more errors than its check codewords can correct
    #[error("too many codeword errors")]
    TooManyErrors,
    /// Segment mode this reader does not decode
    #[error("unsupported segment mode {0}")]
    UnsupportedMode(&'static str),
    /// Mode indicator outside the defined set
    #[error("invalid segment mode indicator {0:#06b}")]
    InvalidMode(u8),
    /// Bit stream ended inside a segment
    #[error("data segment truncated")]
    Truncated,
    /// Decoded data holds no characters
    #[error("symbol holds no data")]
    Empty,
}

/// Failure of a decoding backend
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backend could not be initialised; the engine stays disabled
    #[error("{engine} engine unavailable: {reason}")]
    Unavailable {
        /// Engine that failed its startup probe
        engine: EngineKind,
        /// Human readable cause
        reason: String,
    },
    /// A single decode attempt failed; swallowed at the engine boundary
    #[error("{engine} decode attempt failed: {reason}")]
    DecodeFailed {
        /// Engine that failed
        engine: EngineKind,
        /// Human readable cause
        reason: String,
    },
}

/// Capture collaborator could not supply a frame
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Capture backend is not usable right now
    #[error("capture unavailable: {0}")]
    Unavailable(String),
    /// Window id no longer refers to a live window
    #[error("window {0} not found")]
    WindowNotFound(u64),
    /// Requested region lies outside every monitor
    #[error("region is outside the capturable area")]
    OutsideBounds,
    /// Captured pixels did not form a valid frame
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// Image file backed capture failed to load
    #[error("failed to load {path}: {source}")]
    Image {
        /// File that failed to load
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },
}

/// Failure of an interactive scan entry point
#[derive(Debug, Error)]
pub enum ScanError {
    /// No frame could be captured
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// Captured frame was malformed
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Monitor loop could not be started
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Polling thread failed to spawn
    #[error("failed to spawn monitor thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration could not be read or is inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("config io error at {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// File is not valid TOML for [`crate::config::Config`]
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Serialising the config failed
    #[error("config serialise error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Values parsed but violate an invariant
    #[error("invalid config: {0}")]
    Invalid(String),
}
