use serde::{Deserialize, Serialize};

/// Integer rectangle in screen coordinates
///
/// Width and height are always non-zero; constructors return `None` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// Create a region, rejecting empty rectangles
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Region spanning two corner points in any order
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        // Spans of two i32 values always fit u32
        let width = u32::try_from(right as i64 - left as i64).ok()?;
        let height = u32::try_from(bottom as i64 - top as i64).ok()?;
        Self::new(left, top, width, height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Pixel area
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the point lies inside
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (x as i64) >= self.x as i64
            && (x as i64) < self.right()
            && (y as i64) >= self.y as i64
            && (y as i64) < self.bottom()
    }

    /// Grow every side by `pad` pixels
    pub fn padded(&self, pad: u32) -> Region {
        let pad_i = pad.min(i32::MAX as u32) as i32;
        Region {
            x: self.x.saturating_sub(pad_i),
            y: self.y.saturating_sub(pad_i),
            width: self.width.saturating_add(pad.saturating_mul(2)),
            height: self.height.saturating_add(pad.saturating_mul(2)),
        }
    }

    /// Overlap of two regions, if any
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Region::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }

    /// Clip to `bounds`; `None` when nothing remains
    pub fn clamp_to(&self, bounds: &Region) -> Option<Region> {
        self.intersect(bounds)
    }

    /// Smallest region covering both
    pub fn union(&self, other: &Region) -> Region {
        let left = (self.x as i64).min(other.x as i64);
        let top = (self.y as i64).min(other.y as i64);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Region {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }
}
