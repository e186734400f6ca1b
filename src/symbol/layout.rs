/// Function pattern placement and codeword traversal order
use crate::models::BitMatrix;

/// Side length in modules for a version
pub fn dimension(version: u8) -> usize {
    version as usize * 4 + 17
}

/// Version for a side length, if it is a valid symbol size
pub fn version_for_dimension(dimension: usize) -> Option<u8> {
    if !(21..=177).contains(&dimension) || (dimension - 17) % 4 != 0 {
        return None;
    }
    Some(((dimension - 17) / 4) as u8)
}

/// Centre coordinates of alignment patterns along one axis
pub fn alignment_positions(version: u8) -> Vec<usize> {
    if version < 2 {
        return Vec::new();
    }
    let v = version as usize;
    let count = v / 7 + 2;
    let step = if v == 32 {
        26
    } else {
        (v * 4 + count * 2 + 1) / (count * 2 - 2) * 2
    };

    let mut positions = vec![6];
    let mut pos = dimension(version) - 7;
    for _ in 0..count - 1 {
        positions.insert(1, pos);
        pos -= step;
    }
    positions
}

/// Alignment centres, skipping the three that would overlap finders
fn alignment_centres(version: u8) -> Vec<(usize, usize)> {
    let positions = alignment_positions(version);
    let last = positions.len().saturating_sub(1);
    let mut centres = Vec::new();
    for (i, &x) in positions.iter().enumerate() {
        for (j, &y) in positions.iter().enumerate() {
            let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
            if !corner {
                centres.push((x, y));
            }
        }
    }
    centres
}

/// Modules reserved for function patterns, format and version information
pub struct FunctionMask {
    reserved: BitMatrix,
}

impl FunctionMask {
    /// Reserved modules for a version
    pub fn new(version: u8) -> Self {
        let size = dimension(version);
        let mut reserved = BitMatrix::new(size, size);

        for i in 0..size {
            reserved.set(6, i, true);
            reserved.set(i, 6, true);
        }

        // Finders with separators and the adjacent format areas
        for (cx, cy) in [(3, 3), (size - 4, 3), (3, size - 4)] {
            fill_square(&mut reserved, cx, cy, 4);
        }
        for i in 0..9 {
            reserved.set(8, i, true);
            reserved.set(i, 8, true);
        }
        for i in 0..8 {
            reserved.set(size - 1 - i, 8, true);
            reserved.set(8, size - 1 - i, true);
        }

        for (cx, cy) in alignment_centres(version) {
            fill_square(&mut reserved, cx, cy, 2);
        }

        if version >= 7 {
            for i in 0..18 {
                let a = size - 11 + i % 3;
                let b = i / 3;
                reserved.set(a, b, true);
                reserved.set(b, a, true);
            }
        }

        Self { reserved }
    }

    /// True when (x, y) is not available for data
    pub fn is_reserved(&self, x: usize, y: usize) -> bool {
        self.reserved.get(x, y)
    }

    /// Data module coordinates in placement order
    ///
    /// Two-column strips from the right edge, alternating upward and
    /// downward, skipping the vertical timing column.
    pub fn data_positions(&self) -> Vec<(usize, usize)> {
        let size = self.reserved.width();
        let mut positions = Vec::with_capacity(size * size);
        let mut right = size as isize - 1;

        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            let upward = (right + 1) & 2 == 0;
            for vert in 0..size {
                let y = if upward { size - 1 - vert } else { vert };
                for x in [right as usize, right as usize - 1] {
                    if !self.is_reserved(x, y) {
                        positions.push((x, y));
                    }
                }
            }
            right -= 2;
        }
        positions
    }
}

fn fill_square(matrix: &mut BitMatrix, cx: usize, cy: usize, radius: isize) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (x, y) = (cx as isize + dx, cy as isize + dy);
            if x >= 0 && y >= 0 {
                matrix.set(x as usize, y as usize, true);
            }
        }
    }
}

/// Dark modules of the fixed patterns: finders, timing, alignment and the dark module
///
/// Format and version areas are left light.
pub fn draw_function_patterns(version: u8) -> BitMatrix {
    let size = dimension(version);
    let mut grid = BitMatrix::new(size, size);

    for i in 0..size {
        grid.set(6, i, i % 2 == 0);
        grid.set(i, 6, i % 2 == 0);
    }

    for (cx, cy) in [(3, 3), (size - 4, 3), (3, size - 4)] {
        for dy in -4isize..=4 {
            for dx in -4isize..=4 {
                let (x, y) = (cx as isize + dx, cy as isize + dy);
                if x < 0 || y < 0 || x >= size as isize || y >= size as isize {
                    continue;
                }
                let ring = dx.abs().max(dy.abs());
                grid.set(x as usize, y as usize, ring != 2 && ring != 4);
            }
        }
    }

    for (cx, cy) in alignment_centres(version) {
        for dy in -2isize..=2 {
            for dx in -2isize..=2 {
                let ring = dx.abs().max(dy.abs());
                grid.set((cx as isize + dx) as usize, (cy as isize + dy) as usize, ring != 1);
            }
        }
    }

    grid.set(8, size - 8, true);
    grid
}

/// Fraction of finder and timing modules in `grid` that match the expected pattern
///
/// Used to choose between candidate grid sizes before attempting a full read.
pub fn pattern_agreement(grid: &BitMatrix) -> f32 {
    let size = grid.width();
    let Some(version) = version_for_dimension(size) else {
        return 0.0;
    };
    let expected = draw_function_patterns(version);

    let mut total = 0usize;
    let mut matched = 0usize;
    let mut check = |x: usize, y: usize| {
        total += 1;
        if grid.get(x, y) == expected.get(x, y) {
            matched += 1;
        }
    };
    for i in 8..size - 8 {
        check(6, i);
        check(i, 6);
    }
    for y in 0..7 {
        for x in 0..7 {
            check(x, y);
            check(size - 1 - x, y);
            check(x, size - 1 - y);
        }
    }
    matched as f32 / total as f32
}
