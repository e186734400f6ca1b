//! Preprocessing transforms: pure `Frame -> Frame` conversions
//!
//! Every transform builds a new frame and fails only on malformed input or
//! parameters. Binary and filtered outputs are single-channel `Luma8`.

pub mod equalize;
pub mod filter;
pub mod grayscale;
pub mod resample;
pub mod threshold;

pub use equalize::contrast_equalize;
pub use filter::{invert, sharpen};
pub use grayscale::to_grayscale;
pub use resample::{rescale, resize_to};
pub use threshold::{adaptive_threshold, otsu_threshold};

use crate::error::FrameError;
use crate::models::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named preprocessing step used by the pipeline's transform sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Luminance conversion
    Grayscale,
    /// Global Otsu binarization
    Otsu,
    /// Gaussian adaptive binarization
    Adaptive,
    /// Contrast-limited adaptive histogram equalization
    Clahe,
    /// 3x3 sharpening
    Sharpen,
    /// Photometric inversion for light-on-dark codes
    Invert,
}

impl TransformKind {
    /// Default retry order after the raw frame
    pub const DEFAULT_SEQUENCE: [TransformKind; 5] = [
        TransformKind::Grayscale,
        TransformKind::Otsu,
        TransformKind::Adaptive,
        TransformKind::Clahe,
        TransformKind::Sharpen,
    ];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::Grayscale => "grayscale",
            TransformKind::Otsu => "otsu",
            TransformKind::Adaptive => "adaptive",
            TransformKind::Clahe => "clahe",
            TransformKind::Sharpen => "sharpen",
            TransformKind::Invert => "invert",
        }
    }

    /// Run this transform on `frame`
    pub fn apply(self, frame: &Frame, params: &TransformParams) -> Result<Frame, FrameError> {
        match self {
            TransformKind::Grayscale => to_grayscale(frame),
            TransformKind::Otsu => otsu_threshold(frame),
            TransformKind::Adaptive => {
                adaptive_threshold(frame, params.adaptive_block_size, params.adaptive_c)
            }
            TransformKind::Clahe => {
                contrast_equalize(frame, params.clahe_clip_limit, params.clahe_grid)
            }
            TransformKind::Sharpen => sharpen(frame),
            TransformKind::Invert => invert(frame),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunables for the parameterised transforms
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    /// Odd neighbourhood side for adaptive thresholding
    pub adaptive_block_size: usize,
    /// Constant subtracted from the neighbourhood mean
    pub adaptive_c: i32,
    /// CLAHE clip limit, relative to the mean bin height
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per side
    pub clahe_grid: usize,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            adaptive_block_size: 11,
            adaptive_c: 2,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
        }
    }
}
