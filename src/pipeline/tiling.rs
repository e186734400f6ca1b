//! Raster tile plan for the exhaustive scan of large frames
//!
//! Origins advance by `stride` along each axis; when the last regular tile
//! stops short of the edge, one more tile is aligned flush with it so every
//! pixel band is covered.

/// One tile of a frame, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Left edge
    pub x: usize,
    /// Top edge
    pub y: usize,
    /// Tile width, at most the frame width
    pub width: usize,
    /// Tile height, at most the frame height
    pub height: usize,
}

impl Tile {
    /// True when the pixel rectangle lies entirely inside this tile
    pub fn covers(&self, x: usize, y: usize, width: usize, height: usize) -> bool {
        x >= self.x
            && y >= self.y
            && x + width <= self.x + self.width
            && y + height <= self.y + self.height
    }
}

/// True when either side exceeds `threshold`
pub fn needs_tiling(width: usize, height: usize, threshold: usize) -> bool {
    width > threshold || height > threshold
}

/// Tile origins along one axis
pub fn axis_origins(side: usize, tile: usize, stride: usize) -> Vec<usize> {
    if side <= tile || stride == 0 {
        return vec![0];
    }
    let last = side - tile;
    let mut origins: Vec<usize> = (0..=last).step_by(stride).collect();
    if origins.last() != Some(&last) {
        origins.push(last);
    }
    origins
}

/// Tiles in raster order (rows top to bottom, left to right within a row),
/// truncated to `max_tiles` when set
pub fn plan(
    width: usize,
    height: usize,
    tile: usize,
    stride: usize,
    max_tiles: Option<usize>,
) -> Vec<Tile> {
    let tile_width = tile.min(width);
    let tile_height = tile.min(height);
    let xs = axis_origins(width, tile, stride);
    let ys = axis_origins(height, tile, stride);

    let tiles = ys.iter().flat_map(|&y| {
        xs.iter().map(move |&x| Tile {
            x,
            y,
            width: tile_width,
            height: tile_height,
        })
    });
    match max_tiles {
        Some(limit) => tiles.take(limit).collect(),
        None => tiles.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_origins() {
        assert_eq!(axis_origins(300, 400, 200), vec![0]);
        assert_eq!(axis_origins(400, 400, 200), vec![0]);
        assert_eq!(axis_origins(800, 400, 200), vec![0, 200, 400]);
        // 900 leaves a band past 800, so a final tile is pinned to the edge
        assert_eq!(axis_origins(900, 400, 200), vec![0, 200, 400, 500]);
        assert_eq!(axis_origins(401, 400, 200), vec![0, 1]);
    }

    #[test]
    fn test_plan_is_raster_ordered() {
        let tiles = plan(800, 600, 400, 200, None);
        let origins: Vec<(usize, usize)> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(
            origins,
            vec![(0, 0), (200, 0), (400, 0), (0, 200), (200, 200), (400, 200)]
        );
        assert!(tiles.iter().all(|t| t.width == 400 && t.height == 400));
    }

    #[test]
    fn test_plan_narrow_axis() {
        let tiles = plan(1000, 300, 400, 200, None);
        assert!(tiles.iter().all(|t| t.y == 0 && t.height == 300));
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles.last().unwrap().x, 600);
    }

    #[test]
    fn test_max_tiles() {
        assert_eq!(plan(1000, 1000, 400, 200, Some(3)).len(), 3);
        assert_eq!(plan(1000, 1000, 400, 200, None).len(), 16);
    }

    #[test]
    fn test_every_small_rect_is_covered() {
        // Anything up to tile - stride fits wholly inside some tile
        let (width, height) = (1030, 870);
        let tiles = plan(width, height, 400, 200, None);
        let side = 200;
        for y in (0..=height - side).step_by(37) {
            for x in (0..=width - side).step_by(41) {
                assert!(
                    tiles.iter().any(|t| t.covers(x, y, side, side)),
                    "{},{} uncovered",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_needs_tiling() {
        assert!(!needs_tiling(400, 400, 400));
        assert!(needs_tiling(401, 10, 400));
        assert!(needs_tiling(10, 401, 400));
    }
}
