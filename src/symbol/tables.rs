/// Error correction block structure per version and level
use super::EcLevel;

// Indexed by [level][version - 1], levels in L, M, Q, H order
const EC_CODEWORDS_PER_BLOCK: [[u8; 40]; 4] = [
    [
        7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    [
        13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

const EC_BLOCKS: [[u8; 40]; 4] = [
    [
        1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13, 14,
        15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    [
        1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23,
        25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    [
        1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    [
        1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];

/// How the codewords of one symbol split into Reed-Solomon blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    /// Data codewords in each block; short blocks come first
    pub data_lengths: Vec<usize>,
    /// Error correction codewords appended to every block
    pub ec_per_block: usize,
}

impl BlockLayout {
    /// Layout for a version (1..=40) and level
    pub fn for_symbol(version: u8, level: EcLevel) -> Option<Self> {
        if !(1..=40).contains(&version) {
            return None;
        }
        let row = level.table_index();
        let col = version as usize - 1;
        let blocks = EC_BLOCKS[row][col] as usize;
        let ec_per_block = EC_CODEWORDS_PER_BLOCK[row][col] as usize;

        let total = raw_codewords(version);
        let short_len = total / blocks;
        let short_blocks = blocks - total % blocks;
        let data_lengths = (0..blocks)
            .map(|i| short_len - ec_per_block + usize::from(i >= short_blocks))
            .collect();

        Some(Self {
            data_lengths,
            ec_per_block,
        })
    }

    /// Data codewords over all blocks
    pub fn data_capacity(&self) -> usize {
        self.data_lengths.iter().sum()
    }
}

/// Modules available for codewords once function patterns are excluded
pub fn raw_data_modules(version: u8) -> usize {
    let v = version as usize;
    let mut modules = (16 * v + 128) * v + 64;
    if v >= 2 {
        let align = v / 7 + 2;
        modules -= (25 * align - 10) * align - 55;
        if v >= 7 {
            modules -= 36;
        }
    }
    modules
}

/// Whole codewords in a symbol (remainder bits dropped)
pub fn raw_codewords(version: u8) -> usize {
    raw_data_modules(version) / 8
}
