//! Shared fixtures: a byte-mode QR encoder, a renderer and scripted collaborators
#![allow(dead_code)]

use screen_qr::capture::{ScreenCapture, WindowId};
use screen_qr::engine::{Backend, GeometricEngine};
use screen_qr::error::{CaptureError, EngineError};
use screen_qr::models::{BitMatrix, EngineKind, Frame, Region};
use screen_qr::symbol::format::{self, FormatInfo, Mask};
use screen_qr::symbol::layout::{self, FunctionMask};
use screen_qr::symbol::tables::{self, BlockLayout};
use screen_qr::symbol::{EcLevel, reed_solomon, version};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Interleaved data and check codewords for `text` in byte mode
pub fn encode_codewords(text: &str, version: u8, level: EcLevel) -> Vec<u8> {
    let layout = BlockLayout::for_symbol(version, level).expect("valid version");
    let capacity = layout.data_capacity();

    let mut bits: Vec<bool> = Vec::new();
    push_bits(0b0100, 4, &mut bits);
    push_bits(text.len() as u32, if version <= 9 { 8 } else { 16 }, &mut bits);
    for byte in text.bytes() {
        push_bits(byte as u32, 8, &mut bits);
    }
    assert!(bits.len() <= capacity * 8, "text too long for symbol");
    let terminator = (capacity * 8 - bits.len()).min(4);
    push_bits(0, terminator, &mut bits);
    while bits.len() % 8 != 0 {
        bits.push(false);
    }

    let mut data: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect();
    for pad in [0xEC, 0x11].into_iter().cycle() {
        if data.len() >= capacity {
            break;
        }
        data.push(pad);
    }

    let mut blocks: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    let mut offset = 0;
    for &len in &layout.data_lengths {
        let block = data[offset..offset + len].to_vec();
        let ec = reed_solomon::encode(&block, layout.ec_per_block);
        blocks.push((block, ec));
        offset += len;
    }

    let longest = layout.data_lengths.iter().copied().max().unwrap_or(0);
    let mut out = Vec::with_capacity(tables::raw_codewords(version));
    for i in 0..longest {
        for (block, _) in &blocks {
            if let Some(&b) = block.get(i) {
                out.push(b);
            }
        }
    }
    for i in 0..layout.ec_per_block {
        for (_, ec) in &blocks {
            out.push(ec[i]);
        }
    }
    out
}

fn push_bits(value: u32, count: usize, bits: &mut Vec<bool>) {
    for i in (0..count).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

/// Module grid with the codewords placed, masked and framed by function patterns
pub fn place_codewords(codewords: &[u8], version: u8, level: EcLevel, mask: u8) -> BitMatrix {
    let mask = Mask::new(mask).expect("mask index");
    let mut grid = layout::draw_function_patterns(version);
    for (i, (x, y)) in FunctionMask::new(version).data_positions().into_iter().enumerate() {
        let bit = codewords
            .get(i / 8)
            .map(|&c| (c >> (7 - i % 8)) & 1 == 1)
            .unwrap_or(false);
        grid.set(x, y, bit ^ mask.flips(x, y));
    }
    format::place(&mut grid, &FormatInfo { ec_level: level, mask });
    version::place(&mut grid, version);
    grid
}

/// Complete symbol for `text`
pub fn encode(text: &str, version: u8, level: EcLevel, mask: u8) -> BitMatrix {
    place_codewords(&encode_codewords(text, version, level), version, level, mask)
}

/// Render a grid as an RGB frame: `module` pixels per module, `quiet` modules of margin
pub fn render(grid: &BitMatrix, module: usize, quiet: usize) -> Frame {
    let side = (grid.width() + 2 * quiet) * module;
    let mut canvas = Canvas::new(side, side);
    canvas.draw(grid, module, quiet * module, quiet * module);
    canvas.into_frame()
}

/// White RGB canvas codes can be drawn onto
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width * height * 3],
        }
    }

    /// Draw a grid with its top-left module corner at (left, top)
    pub fn draw(&mut self, grid: &BitMatrix, module: usize, left: usize, top: usize) {
        for my in 0..grid.height() {
            for mx in 0..grid.width() {
                if !grid.get(mx, my) {
                    continue;
                }
                for y in top + my * module..top + (my + 1) * module {
                    for x in left + mx * module..left + (mx + 1) * module {
                        let i = (y * self.width + x) * 3;
                        self.pixels[i..i + 3].fill(0);
                    }
                }
            }
        }
    }

    pub fn into_frame(self) -> Frame {
        Frame::from_rgb(self.width, self.height, self.pixels).expect("canvas frame")
    }
}

/// Geometric reader that ignores frames larger than `max_side`, so hits on
/// big frames can only come from tiles
pub struct TileOnly {
    pub max_side: usize,
    pub inner: GeometricEngine,
}

impl Backend for TileOnly {
    fn kind(&self) -> EngineKind {
        EngineKind::Geometric
    }

    fn decode(&self, frame: &Frame) -> Result<Option<String>, EngineError> {
        if frame.max_side() > self.max_side {
            return Ok(None);
        }
        self.inner.decode(frame)
    }
}

/// Engine that never finds anything
pub struct Blind(pub EngineKind);

impl Backend for Blind {
    fn kind(&self) -> EngineKind {
        self.0
    }

    fn decode(&self, _frame: &Frame) -> Result<Option<String>, EngineError> {
        Ok(None)
    }
}

/// Engine whose startup probe fails
pub struct Broken(pub EngineKind);

impl Backend for Broken {
    fn kind(&self) -> EngineKind {
        self.0
    }

    fn probe(&self) -> Result<(), EngineError> {
        Err(EngineError::Unavailable {
            engine: self.0,
            reason: "model file missing".into(),
        })
    }

    fn decode(&self, _frame: &Frame) -> Result<Option<String>, EngineError> {
        panic!("unavailable engine must never be called")
    }
}

/// One window whose captures come from a script; each frame's first pixel
/// byte tags which scripted result it stands for
pub struct ScriptedCapture {
    pub title: String,
    frames: Mutex<VecDeque<u8>>,
    pub fallback: u8,
}

impl ScriptedCapture {
    pub fn new(title: &str, tags: &[u8], fallback: u8) -> Self {
        Self {
            title: title.to_string(),
            frames: Mutex::new(tags.iter().copied().collect()),
            fallback,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl ScreenCapture for ScriptedCapture {
    fn capture_region(&self, _region: Region) -> Result<Frame, CaptureError> {
        Err(CaptureError::Unavailable("scripted capture has no screen".into()))
    }

    fn capture_window(&self, id: WindowId) -> Result<Frame, CaptureError> {
        if id != 1 {
            return Err(CaptureError::WindowNotFound(id));
        }
        let tag = self.frames.lock().unwrap().pop_front().unwrap_or(self.fallback);
        Ok(Frame::filled(4, 4, tag)?)
    }

    fn enumerate_windows(&self, title: &str) -> Result<Vec<WindowId>, CaptureError> {
        Ok(if screen_qr::capture::title_matches(&self.title, title) {
            vec![1]
        } else {
            Vec::new()
        })
    }

    fn list_monitors(&self) -> Result<Vec<Region>, CaptureError> {
        Ok(Vec::new())
    }
}
