use crate::transform::TransformKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoding engine variants, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Learned localizer followed by crop-and-decode
    Neural,
    /// Finder-pattern detector with perspective sampling
    Geometric,
    /// Axis-aligned scanline reader
    Linear,
}

impl EngineKind {
    /// All variants in default rank order
    pub const ALL: [EngineKind; 3] = [
        EngineKind::Neural,
        EngineKind::Geometric,
        EngineKind::Linear,
    ];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Neural => "neural",
            EngineKind::Geometric => "geometric",
            EngineKind::Linear => "linear",
        }
    }

    /// Default priority rank (lower is tried first)
    pub fn default_rank(self) -> u8 {
        match self {
            EngineKind::Neural => 0,
            EngineKind::Geometric => 1,
            EngineKind::Linear => 2,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which variant of the input frame an attempt ran on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Untouched input pixels
    Raw,
    /// Output of one preprocessing transform
    Transformed(TransformKind),
    /// Raw pixels resampled by a factor
    Rescaled(f32),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Raw => f.write_str("raw"),
            Stage::Transformed(kind) => write!(f, "{}", kind),
            Stage::Rescaled(factor) => write!(f, "scale{:.2}", factor),
        }
    }
}

/// A successfully decoded code and the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    text: String,
    engine: EngineKind,
    stage: Stage,
    tile: Option<(usize, usize)>,
}

impl DetectionResult {
    /// Build a result; empty text is not a result
    pub fn new(text: impl Into<String>, engine: EngineKind, stage: Stage) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text,
            engine,
            stage,
            tile: None,
        })
    }

    /// Record the origin of the tile the code was found in
    pub fn within_tile(mut self, x: usize, y: usize) -> Self {
        self.tile = Some((x, y));
        self
    }

    /// Decoded text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Engine that decoded it
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Frame variant the engine ran on
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Tile origin for hits from the tiled scan
    pub fn tile(&self) -> Option<(usize, usize)> {
        self.tile
    }

    /// Identifier of the engine/transform combination, e.g. `linear/otsu@400,200`
    pub fn attempt_id(&self) -> String {
        match self.tile {
            Some((x, y)) => format!("{}/{}@{},{}", self.engine, self.stage, x, y),
            None => format!("{}/{}", self.engine, self.stage),
        }
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.text, self.attempt_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_not_a_result() {
        assert!(DetectionResult::new("", EngineKind::Linear, Stage::Raw).is_none());
    }

    #[test]
    fn test_attempt_id() {
        let stage = Stage::Transformed(TransformKind::Otsu);
        let hit = DetectionResult::new("hello", EngineKind::Linear, stage)
            .unwrap()
            .within_tile(400, 200);
        assert_eq!(hit.attempt_id(), "linear/otsu@400,200");
        assert_eq!(hit.text(), "hello");
        let raw = DetectionResult::new("x", EngineKind::Neural, Stage::Rescaled(2.0)).unwrap();
        assert_eq!(raw.attempt_id(), "neural/scale2.00");
    }

    #[test]
    fn test_rank_order() {
        let mut kinds = EngineKind::ALL;
        kinds.sort_by_key(|k| k.default_rank());
        assert_eq!(kinds, EngineKind::ALL);
    }
}
