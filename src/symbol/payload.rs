/// Segment parsing of the corrected data codewords
use crate::error::SymbolError;

const ALPHANUMERIC: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// ECI assignment for ISO-8859-1
const ECI_LATIN1: u32 = 3;
/// ECI assignment for UTF-8
const ECI_UTF8: u32 = 26;

/// MSB-first reader over codeword bytes
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start at the first bit of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bits left to read
    pub fn available(&self) -> usize {
        self.bytes.len() * 8 - self.pos
    }

    /// Read `count` (<= 32) bits as an unsigned value
    pub fn read(&mut self, count: usize) -> Result<u32, SymbolError> {
        if count > self.available() {
            return Err(SymbolError::Truncated);
        }
        let mut value = 0u32;
        for _ in 0..count {
            let bit = (self.bytes[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.pos += 1;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
}

impl Mode {
    fn count_bits(self, version: u8) -> usize {
        let group = match version {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match self {
            Mode::Numeric => [10, 12, 14][group],
            Mode::Alphanumeric => [9, 11, 13][group],
            Mode::Byte => [8, 16, 16][group],
            Mode::Kanji => [8, 10, 12][group],
        }
    }
}

/// Decode the data codewords of a symbol into text
///
/// Byte segments are UTF-8 unless an ECI selects ISO-8859-1; invalid UTF-8
/// falls back to ISO-8859-1.
pub fn decode(data: &[u8], version: u8) -> Result<String, SymbolError> {
    let mut reader = BitReader::new(data);
    let mut bytes = Vec::new();
    let mut eci = None;

    while reader.available() >= 4 {
        let mode = match reader.read(4)? {
            0b0000 => break,
            0b0001 => Mode::Numeric,
            0b0010 => Mode::Alphanumeric,
            0b0100 => Mode::Byte,
            0b1000 => Mode::Kanji,
            0b0111 => {
                eci = Some(read_eci(&mut reader)?);
                continue;
            }
            // Structured append: sequence and parity
            0b0011 => {
                reader.read(16)?;
                continue;
            }
            0b0101 => continue,
            0b1001 => {
                reader.read(8)?;
                continue;
            }
            other => return Err(SymbolError::InvalidMode(other as u8)),
        };

        let count = reader.read(mode.count_bits(version))? as usize;
        match mode {
            Mode::Numeric => read_numeric(&mut reader, count, &mut bytes)?,
            Mode::Alphanumeric => read_alphanumeric(&mut reader, count, &mut bytes)?,
            Mode::Byte => {
                for _ in 0..count {
                    bytes.push(reader.read(8)? as u8);
                }
            }
            Mode::Kanji => return Err(SymbolError::UnsupportedMode("kanji")),
        }
    }

    if bytes.is_empty() {
        return Err(SymbolError::Empty);
    }
    Ok(match eci {
        Some(ECI_LATIN1) => latin1(&bytes),
        Some(ECI_UTF8) | None => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => latin1(err.as_bytes()),
        },
        Some(other) => {
            log::debug!("ECI {} not mapped, reading bytes as UTF-8", other);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    })
}

fn read_eci(reader: &mut BitReader<'_>) -> Result<u32, SymbolError> {
    let first = reader.read(8)?;
    if first & 0x80 == 0 {
        Ok(first & 0x7F)
    } else if first & 0xC0 == 0x80 {
        Ok(((first & 0x3F) << 8) | reader.read(8)?)
    } else if first & 0xE0 == 0xC0 {
        Ok(((first & 0x1F) << 16) | reader.read(16)?)
    } else {
        Err(SymbolError::InvalidMode(0b0111))
    }
}

fn read_numeric(
    reader: &mut BitReader<'_>,
    count: usize,
    out: &mut Vec<u8>,
) -> Result<(), SymbolError> {
    let mut remaining = count;
    while remaining > 0 {
        let (digits, bits) = match remaining {
            1 => (1, 4),
            2 => (2, 7),
            _ => (3, 10),
        };
        let value = reader.read(bits)?;
        if value >= 10u32.pow(digits as u32) {
            return Err(SymbolError::Truncated);
        }
        let text = format!("{:0width$}", value, width = digits);
        out.extend_from_slice(text.as_bytes());
        remaining -= digits;
    }
    Ok(())
}

fn read_alphanumeric(
    reader: &mut BitReader<'_>,
    count: usize,
    out: &mut Vec<u8>,
) -> Result<(), SymbolError> {
    let mut remaining = count;
    while remaining >= 2 {
        let value = reader.read(11)? as usize;
        let (hi, lo) = (value / 45, value % 45);
        if hi >= 45 {
            return Err(SymbolError::Truncated);
        }
        out.push(ALPHANUMERIC[hi]);
        out.push(ALPHANUMERIC[lo]);
        remaining -= 2;
    }
    if remaining == 1 {
        let value = reader.read(6)? as usize;
        let &c = ALPHANUMERIC.get(value).ok_or(SymbolError::Truncated)?;
        out.push(c);
    }
    Ok(())
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
