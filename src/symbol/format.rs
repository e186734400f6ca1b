/// Format information (level + mask) and data masking
use super::EcLevel;
use crate::models::BitMatrix;

const FORMAT_GENERATOR: u32 = 0x537;
const FORMAT_XOR: u32 = 0x5412;
/// BCH(15,5) corrects up to three bit errors
const MAX_FORMAT_DISTANCE: u32 = 3;

/// One of the eight data mask patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask(u8);

impl Mask {
    /// Mask pattern by index (0..=7)
    pub fn new(index: u8) -> Option<Self> {
        (index < 8).then_some(Self(index))
    }

    /// Pattern index
    pub fn index(self) -> u8 {
        self.0
    }

    /// True when the module at column `x`, row `y` is inverted by this mask
    pub fn flips(self, x: usize, y: usize) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => x * y % 2 + x * y % 3 == 0,
            6 => (x * y % 2 + x * y % 3) % 2 == 0,
            _ => ((x + y) % 2 + x * y % 3) % 2 == 0,
        }
    }
}

/// Decoded format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Error correction level
    pub ec_level: EcLevel,
    /// Data mask
    pub mask: Mask,
}

impl FormatInfo {
    /// 15-bit masked codeword as placed in the symbol
    pub fn codeword(&self) -> u32 {
        let data = ((self.ec_level.format_bits() as u32) << 3) | self.mask.index() as u32;
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
        }
        ((data << 10) | (rem & 0x3FF)) ^ FORMAT_XOR
    }

    /// Nearest valid format within correction distance of either copy
    pub fn decode(copies: [u32; 2]) -> Option<Self> {
        let mut best: Option<(u32, FormatInfo)> = None;
        for level in EcLevel::ALL {
            for index in 0..8 {
                let candidate = FormatInfo {
                    ec_level: level,
                    mask: Mask(index),
                };
                let codeword = candidate.codeword();
                let distance = copies
                    .iter()
                    .map(|c| (c ^ codeword).count_ones())
                    .min()
                    .unwrap_or(u32::MAX);
                if best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, candidate));
                }
            }
        }
        best.filter(|(d, _)| *d <= MAX_FORMAT_DISTANCE).map(|(_, info)| info)
    }

    /// Read both copies from a grid
    pub fn read(grid: &BitMatrix) -> Option<Self> {
        Self::decode(read_copies(grid))
    }
}

/// Module coordinates of format bit `i` in the first (top-left) copy
fn first_copy_position(i: usize) -> (usize, usize) {
    match i {
        0..=5 => (8, i),
        6 => (8, 7),
        7 => (8, 8),
        8 => (7, 8),
        _ => (14 - i, 8),
    }
}

/// Module coordinates of format bit `i` in the second (split) copy
fn second_copy_position(i: usize, size: usize) -> (usize, usize) {
    if i < 8 {
        (size - 1 - i, 8)
    } else {
        (8, size - 15 + i)
    }
}

fn read_copies(grid: &BitMatrix) -> [u32; 2] {
    let size = grid.width();
    let mut first = 0u32;
    let mut second = 0u32;
    for i in 0..15 {
        let (x, y) = first_copy_position(i);
        first |= (grid.get(x, y) as u32) << i;
        let (x, y) = second_copy_position(i, size);
        second |= (grid.get(x, y) as u32) << i;
    }
    [first, second]
}

/// Write both copies of the format codeword into a grid
pub fn place(grid: &mut BitMatrix, info: &FormatInfo) {
    let size = grid.width();
    let codeword = info.codeword();
    for i in 0..15 {
        let bit = (codeword >> i) & 1 == 1;
        let (x, y) = first_copy_position(i);
        grid.set(x, y, bit);
        let (x, y) = second_copy_position(i, size);
        grid.set(x, y, bit);
    }
}
