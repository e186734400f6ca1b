/// Fast axis-aligned reader: fixed threshold, row/column finder scans, direct grid sampling
use super::Backend;
use super::finder::{self, FinderTriplet};
use crate::error::EngineError;
use crate::models::{BitMatrix, EngineKind, Frame, Point};
use crate::symbol;
use crate::transform::threshold::binarize_at;

/// Mid-grey binarization level
const FIXED_LEVEL: u8 = 128;
/// Finder offsets off the row/column axis tolerated, in modules
const AXIS_TOLERANCE: f32 = 1.5;

/// Axis-aligned scanline reader without a perspective model
#[derive(Debug, Default, Clone)]
pub struct LinearEngine;

impl LinearEngine {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }
}

impl Backend for LinearEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Linear
    }

    fn decode(&self, frame: &Frame) -> Result<Option<String>, EngineError> {
        let gray = frame.luma();
        let image = binarize_at(&gray, frame.width(), frame.height(), FIXED_LEVEL);

        let patterns = finder::find_patterns(&image);
        if patterns.len() < 3 {
            return Ok(None);
        }

        for triplet in finder::group_triplets(&patterns, 4) {
            if !axis_aligned(&triplet) {
                continue;
            }
            for dim in triplet.dimension_candidates() {
                let grid = sample_grid(&image, &triplet, dim);
                if let Ok(symbol) = symbol::decode_grid(&grid) {
                    return Ok(Some(symbol.text));
                }
            }
        }
        Ok(None)
    }
}

/// Both symbol axes run along image rows or columns
fn axis_aligned(triplet: &FinderTriplet) -> bool {
    let limit = triplet.module_size * AXIS_TOLERANCE;
    let along = |a: Point, b: Point| {
        let (dx, dy) = ((b.x - a.x).abs(), (b.y - a.y).abs());
        dx.min(dy) <= limit
    };
    along(triplet.top_left, triplet.top_right) && along(triplet.top_left, triplet.bottom_left)
}

/// Module centres on the lattice spanned by the finder centres
fn sample_grid(image: &BitMatrix, triplet: &FinderTriplet, dim: usize) -> BitMatrix {
    let span = dim as f32 - 7.0;
    let tl = triplet.top_left;
    let (ux, uy) = ((triplet.top_right.x - tl.x) / span, (triplet.top_right.y - tl.y) / span);
    let (vx, vy) = ((triplet.bottom_left.x - tl.x) / span, (triplet.bottom_left.y - tl.y) / span);

    BitMatrix::from_fn(dim, dim, |mx, my| {
        let (ox, oy) = (mx as f32 - 3.0, my as f32 - 3.0);
        let x = tl.x + ox * ux + oy * vx;
        let y = tl.y + ox * uy + oy * vy;
        x >= 0.0 && y >= 0.0 && image.get(x as usize, y as usize)
    })
}
