/// Classical detector: finder triplets, alignment refinement, perspective sampling
use super::Backend;
use super::finder::{self, FinderTriplet};
use crate::error::EngineError;
use crate::geometry::PerspectiveTransform;
use crate::models::{BitMatrix, EngineKind, Frame, Point};
use crate::symbol::{self, layout};
use crate::transform::threshold::{binarize_at, otsu_level};

/// Triplets tried per frame
const MAX_TRIPLETS: usize = 6;
/// Minimum template matches (out of 25) to accept an alignment pattern
const ALIGNMENT_MIN_MATCHES: usize = 22;

/// Finder-pattern detector with perspective sampling
#[derive(Debug, Default, Clone)]
pub struct GeometricEngine;

impl GeometricEngine {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }

    /// Locate and read the first decodable symbol in a binarized image
    pub fn decode_matrix(&self, image: &BitMatrix) -> Option<String> {
        let patterns = finder::find_patterns(image);
        if patterns.len() < 3 {
            return None;
        }

        for triplet in finder::group_triplets(&patterns, MAX_TRIPLETS) {
            if let Some(text) = read_triplet(image, &triplet) {
                return Some(text);
            }
        }
        None
    }
}

impl Backend for GeometricEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Geometric
    }

    fn decode(&self, frame: &Frame) -> Result<Option<String>, EngineError> {
        let gray = frame.luma();
        let level = otsu_level(&gray);
        let image = binarize_at(&gray, frame.width(), frame.height(), level);
        Ok(self.decode_matrix(&image))
    }
}

fn read_triplet(image: &BitMatrix, triplet: &FinderTriplet) -> Option<String> {
    let mut grids: Vec<(f32, BitMatrix)> = triplet
        .dimension_candidates()
        .into_iter()
        .filter_map(|dim| sample_symbol(image, triplet, dim))
        .map(|grid| (layout::pattern_agreement(&grid), grid))
        .collect();
    grids.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (agreement, grid) in grids {
        match symbol::decode_grid(&grid) {
            Ok(symbol) => {
                log::debug!(
                    "geometric: read version {} ({:?}), {} corrections",
                    symbol.version,
                    symbol.ec_level,
                    symbol.corrected
                );
                return Some(symbol.text);
            }
            Err(err) => log::trace!(
                "geometric: {}x{} grid (agreement {:.2}) unreadable: {}",
                grid.width(),
                grid.width(),
                agreement,
                err
            ),
        }
    }
    None
}

/// Sample a `dim` x `dim` module grid through a perspective fitted to the finders
fn sample_symbol(image: &BitMatrix, triplet: &FinderTriplet, dim: usize) -> Option<BitMatrix> {
    let d = dim as f32;
    let span = d - 7.0;
    let tl = triplet.top_left;
    let u = Point::new(
        (triplet.top_right.x - tl.x) / span,
        (triplet.top_right.y - tl.y) / span,
    );
    let v = Point::new(
        (triplet.bottom_left.x - tl.x) / span,
        (triplet.bottom_left.y - tl.y) / span,
    );
    let affine = |mx: f32, my: f32| {
        let (ox, oy) = (mx - 3.5, my - 3.5);
        Point::new(tl.x + ox * u.x + oy * v.x, tl.y + ox * u.y + oy * v.y)
    };

    let (module_anchor, image_anchor) = if dim > 21 {
        let predicted = affine(d - 6.5, d - 6.5);
        match find_alignment(image, predicted, u, v, triplet.module_size) {
            Some(found) => (Point::new(d - 6.5, d - 6.5), found),
            None => (Point::new(d - 3.5, d - 3.5), affine(d - 3.5, d - 3.5)),
        }
    } else {
        (Point::new(d - 3.5, d - 3.5), affine(d - 3.5, d - 3.5))
    };

    let transform = PerspectiveTransform::from_points(
        &[
            Point::new(3.5, 3.5),
            Point::new(d - 3.5, 3.5),
            Point::new(3.5, d - 3.5),
            module_anchor,
        ],
        &[triplet.top_left, triplet.top_right, triplet.bottom_left, image_anchor],
    )?;

    Some(BitMatrix::from_fn(dim, dim, |mx, my| {
        let p = transform.transform(&Point::new(mx as f32 + 0.5, my as f32 + 0.5));
        is_dark(image, p)
    }))
}

fn is_dark(image: &BitMatrix, p: Point) -> bool {
    if !p.x.is_finite() || !p.y.is_finite() || p.x < 0.0 || p.y < 0.0 {
        return false;
    }
    image.get(p.x as usize, p.y as usize)
}

/// Search around the predicted position for the best 5x5 alignment template match
fn find_alignment(
    image: &BitMatrix,
    predicted: Point,
    u: Point,
    v: Point,
    module_size: f32,
) -> Option<Point> {
    let radius = (module_size * 4.0).ceil() as i32;
    let step = (module_size / 3.0).max(1.0) as i32;

    let mut best: Option<(usize, f32, Point)> = None;
    for dy in (-radius..=radius).step_by(step as usize) {
        for dx in (-radius..=radius).step_by(step as usize) {
            let centre = predicted.translate(dx as f32, dy as f32);
            let matches = alignment_matches(image, centre, u, v);
            let offset = (dx * dx + dy * dy) as f32;
            let better = match best {
                None => true,
                Some((m, o, _)) => matches > m || (matches == m && offset < o),
            };
            if better {
                best = Some((matches, offset, centre));
            }
        }
    }

    best.filter(|(m, _, _)| *m >= ALIGNMENT_MIN_MATCHES).map(|(_, _, p)| p)
}

fn alignment_matches(image: &BitMatrix, centre: Point, u: Point, v: Point) -> usize {
    let mut matches = 0;
    for my in -2i32..=2 {
        for mx in -2i32..=2 {
            let expected_dark = mx.abs().max(my.abs()) != 1;
            let p = Point::new(
                centre.x + mx as f32 * u.x + my as f32 * v.x,
                centre.y + mx as f32 * u.y + my as f32 * v.y,
            );
            if is_dark(image, p) == expected_dark {
                matches += 1;
            }
        }
    }
    matches
}
