/// Version information blocks carried by versions 7 and above
use crate::models::BitMatrix;

const VERSION_GENERATOR: u32 = 0x1F25;
const MAX_VERSION_DISTANCE: u32 = 3;

/// 18-bit version codeword: 6 data bits followed by 12 BCH bits
pub fn codeword(version: u8) -> u32 {
    let data = version as u32;
    let mut rem = data;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
    }
    (data << 12) | (rem & 0xFFF)
}

/// Coordinates of bit `i` in the top-right block; the bottom-left block is its transpose
fn position(i: usize, size: usize) -> (usize, usize) {
    (size - 11 + i % 3, i / 3)
}

/// Read the version from either block; `None` below version 7 or when unreadable
pub fn read(grid: &BitMatrix) -> Option<u8> {
    let size = grid.width();
    if size < 45 {
        return None;
    }

    let mut top_right = 0u32;
    let mut bottom_left = 0u32;
    for i in 0..18 {
        let (a, b) = position(i, size);
        top_right |= (grid.get(a, b) as u32) << i;
        bottom_left |= (grid.get(b, a) as u32) << i;
    }

    (7..=40u8)
        .map(|v| {
            let c = codeword(v);
            let d = (c ^ top_right).count_ones().min((c ^ bottom_left).count_ones());
            (d, v)
        })
        .min()
        .filter(|(d, _)| *d <= MAX_VERSION_DISTANCE)
        .map(|(_, v)| v)
}

/// Write both version blocks into a grid of a version 7+ symbol
pub fn place(grid: &mut BitMatrix, version: u8) {
    if version < 7 {
        return;
    }
    let size = grid.width();
    let bits = codeword(version);
    for i in 0..18 {
        let bit = (bits >> i) & 1 == 1;
        let (a, b) = position(i, size);
        grid.set(a, b, bit);
        grid.set(b, a, bit);
    }
}
