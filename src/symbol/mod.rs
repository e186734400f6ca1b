//! QR symbol reader shared by every engine
//!
//! Engines locate a symbol and sample it into a module grid (`true` = dark,
//! finder patterns at top-left, top-right and bottom-left). This module turns
//! that grid into text: format and version information, unmasking, codeword
//! de-interleaving, Reed-Solomon correction and segment parsing.

pub mod format;
pub mod layout;
pub mod payload;
pub mod reed_solomon;
pub mod tables;
pub mod version;

use crate::error::SymbolError;
use crate::models::BitMatrix;
use format::{FormatInfo, Mask};
use layout::FunctionMask;
use tables::BlockLayout;

/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcLevel {
    /// ~7% recovery
    L,
    /// ~15% recovery
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl EcLevel {
    /// All levels, lowest redundancy first
    pub const ALL: [EcLevel; 4] = [EcLevel::L, EcLevel::M, EcLevel::Q, EcLevel::H];

    /// Two-bit value stored in the format information
    pub fn format_bits(self) -> u8 {
        match self {
            EcLevel::L => 0b01,
            EcLevel::M => 0b00,
            EcLevel::Q => 0b11,
            EcLevel::H => 0b10,
        }
    }

    fn table_index(self) -> usize {
        match self {
            EcLevel::L => 0,
            EcLevel::M => 1,
            EcLevel::Q => 2,
            EcLevel::H => 3,
        }
    }
}

/// A successfully read symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Version (1..=40)
    pub version: u8,
    /// Error correction level
    pub ec_level: EcLevel,
    /// Data mask that was applied
    pub mask: Mask,
    /// Codewords repaired by Reed-Solomon
    pub corrected: usize,
    /// Decoded text
    pub text: String,
}

/// Read a grid in its given orientation
pub fn read_symbol(grid: &BitMatrix) -> Result<Symbol, SymbolError> {
    let (width, height) = (grid.width(), grid.height());
    let version = match layout::version_for_dimension(width) {
        Some(v) if width == height => v,
        _ => return Err(SymbolError::InvalidDimension { width, height }),
    };

    if let Some(found) = version::read(grid) {
        if found != version {
            return Err(SymbolError::VersionMismatch {
                expected: version,
                found,
            });
        }
    }

    let FormatInfo { ec_level, mask } =
        FormatInfo::read(grid).ok_or(SymbolError::FormatUnreadable)?;
    let block_layout = BlockLayout::for_symbol(version, ec_level)
        .ok_or(SymbolError::InvalidDimension { width, height })?;

    let codewords = read_codewords(grid, version, mask);
    let (data, corrected) = correct_blocks(&codewords, &block_layout)?;
    let text = payload::decode(&data, version)?;

    Ok(Symbol {
        version,
        ec_level,
        mask,
        corrected,
        text,
    })
}

/// Read a grid, retrying the mirrored reading when the direct one fails
pub fn decode_grid(grid: &BitMatrix) -> Result<Symbol, SymbolError> {
    match read_symbol(grid) {
        Ok(symbol) => Ok(symbol),
        Err(err) => read_symbol(&grid.transposed()).map_err(|_| err),
    }
}

/// Unmasked codewords in placement order
fn read_codewords(grid: &BitMatrix, version: u8, mask: Mask) -> Vec<u8> {
    let positions = FunctionMask::new(version).data_positions();
    let total = tables::raw_codewords(version);

    let mut codewords = vec![0u8; total];
    for (i, &(x, y)) in positions.iter().take(total * 8).enumerate() {
        if grid.get(x, y) ^ mask.flips(x, y) {
            codewords[i / 8] |= 0x80 >> (i % 8);
        }
    }
    codewords
}

/// Split interleaved codewords into blocks, correct each, and concatenate the data
fn correct_blocks(
    codewords: &[u8],
    block_layout: &BlockLayout,
) -> Result<(Vec<u8>, usize), SymbolError> {
    let lengths = &block_layout.data_lengths;
    let ec_len = block_layout.ec_per_block;
    let longest = lengths.iter().copied().max().unwrap_or(0);

    let mut blocks: Vec<Vec<u8>> = lengths
        .iter()
        .map(|&d| Vec::with_capacity(d + ec_len))
        .collect();
    let mut source = codewords.iter().copied();
    for i in 0..longest {
        for (block, &len) in blocks.iter_mut().zip(lengths) {
            if i < len {
                block.push(source.next().ok_or(SymbolError::Truncated)?);
            }
        }
    }
    for _ in 0..ec_len {
        for block in blocks.iter_mut() {
            block.push(source.next().ok_or(SymbolError::Truncated)?);
        }
    }

    let mut data = Vec::with_capacity(block_layout.data_capacity());
    let mut corrected = 0;
    for (mut block, &len) in blocks.into_iter().zip(lengths) {
        corrected += reed_solomon::correct(&mut block, ec_len)?;
        data.extend_from_slice(&block[..len]);
    }
    Ok((data, corrected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            read_symbol(&BitMatrix::new(20, 20)),
            Err(SymbolError::InvalidDimension { .. })
        ));
        assert!(matches!(
            read_symbol(&BitMatrix::new(21, 25)),
            Err(SymbolError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_blank_grid_has_no_format() {
        assert_eq!(
            decode_grid(&BitMatrix::new(21, 21)),
            Err(SymbolError::FormatUnreadable)
        );
    }

    #[test]
    fn test_level_bits_are_distinct() {
        let mut bits: Vec<u8> = EcLevel::ALL.iter().map(|l| l.format_bits()).collect();
        bits.sort();
        bits.dedup();
        assert_eq!(bits.len(), 4);
    }
}
