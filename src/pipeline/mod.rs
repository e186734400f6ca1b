//! Detection pipeline: engines x transforms over a frame and its tiles
//!
//! Attempt order, first success wins:
//! 1. every available engine on the raw frame
//! 2. every engine on each configured transform of the raw frame
//! 3. every engine on each admissible rescale of the raw frame
//! 4. for frames past the tiling threshold, steps 1 and 2 on every tile
//!
//! The pipeline holds no mutable state; concurrent `detect` calls are safe.

pub mod tiling;

pub use tiling::Tile;

use crate::config::{Config, PipelineConfig};
use crate::engine::EngineSet;
use crate::error::FrameError;
use crate::models::{DetectionResult, EngineKind, Frame, Stage};
use crate::transform::{self, TransformParams};
use log::{debug, info, warn};
use std::fmt;

/// Anything that can turn a frame into at most one result
///
/// The monitor and scanner depend on this rather than on [`Pipeline`]
/// directly so tests can script detection.
pub trait Detect: Send + Sync {
    /// Search `frame` for a code
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, FrameError>;
}

/// One engine invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempt {
    /// Engine that ran
    pub engine: EngineKind,
    /// Frame variant it ran on
    pub stage: Stage,
    /// Tile origin, for attempts of the tiled scan
    pub tile: Option<(usize, usize)>,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.engine, self.stage)?;
        if let Some((x, y)) = self.tile {
            write!(f, "@{},{}", x, y)?;
        }
        Ok(())
    }
}

/// Ordered log of every attempt one `detect` made
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineTrace {
    attempts: Vec<Attempt>,
}

impl PipelineTrace {
    fn record(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// Attempts in the order they ran
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Number of attempts
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// True when no engine ran
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Attempts on whole-frame variants, before any tile
    pub fn untiled(&self) -> impl Iterator<Item = &Attempt> + '_ {
        self.attempts.iter().filter(|a| a.tile.is_none())
    }

    /// Distinct tile origins visited, in visiting order
    pub fn tiles_visited(&self) -> Vec<(usize, usize)> {
        let mut tiles: Vec<(usize, usize)> = Vec::new();
        for origin in self.attempts.iter().filter_map(|a| a.tile) {
            if tiles.last() != Some(&origin) {
                tiles.push(origin);
            }
        }
        tiles
    }
}

/// Ordered multi-engine, multi-transform detector
pub struct Pipeline {
    engines: EngineSet,
    config: PipelineConfig,
    params: TransformParams,
}

impl Pipeline {
    /// Pipeline over an injected engine set
    pub fn new(engines: EngineSet, config: PipelineConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("pipeline settings will skip some variants: {}", e);
        }
        let params = config.transform_params();
        Self {
            engines,
            config,
            params,
        }
    }

    /// Engines and pipeline settings from a full configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(EngineSet::from_config(&config.engines), config.pipeline.clone())
    }

    /// Standard engines with default settings
    pub fn standard() -> Self {
        Self::new(EngineSet::standard(), PipelineConfig::default())
    }

    /// The owned engine set
    pub fn engines(&self) -> &EngineSet {
        &self.engines
    }

    /// Active settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Search a frame for a code; `Ok(None)` when nothing decodes
    pub fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, FrameError> {
        self.detect_traced(frame).map(|(hit, _)| hit)
    }

    /// [`Pipeline::detect`] plus the log of attempts it made
    pub fn detect_traced(
        &self,
        frame: &Frame,
    ) -> Result<(Option<DetectionResult>, PipelineTrace), FrameError> {
        let mut trace = PipelineTrace::default();
        if self.engines.available_count() == 0 {
            debug!("no decoding engine available");
            return Ok((None, trace));
        }

        let hit = self.search(frame, &mut trace);
        match &hit {
            Some(result) => info!(
                "decoded after {} attempts via {}",
                trace.len(),
                result.attempt_id()
            ),
            None => debug!(
                "no code in {}x{} frame after {} attempts",
                frame.width(),
                frame.height(),
                trace.len()
            ),
        }
        Ok((hit, trace))
    }

    /// Rescale factors that will run on a frame of this size, in order
    pub fn admissible_scales(&self, width: usize, height: usize) -> Vec<f32> {
        self.config
            .scales
            .iter()
            .copied()
            .filter(|&factor| {
                if factor == 1.0 || !factor.is_finite() || factor <= 0.0 {
                    return false;
                }
                let w = transform::resample::scaled_side(width, factor);
                let h = transform::resample::scaled_side(height, factor);
                if factor > 1.0 {
                    w.max(h) <= self.config.max_upscaled_side
                } else {
                    w.min(h) >= self.config.min_downscaled_side
                }
            })
            .collect()
    }

    /// Tiles the exhaustive scan visits; empty below the tiling threshold
    pub fn tile_plan(&self, width: usize, height: usize) -> Vec<Tile> {
        if !tiling::needs_tiling(width, height, self.config.tiling_threshold) {
            return Vec::new();
        }
        tiling::plan(
            width,
            height,
            self.config.tile_size,
            self.config.tile_stride,
            self.config.max_tiles,
        )
    }

    fn search(&self, frame: &Frame, trace: &mut PipelineTrace) -> Option<DetectionResult> {
        if let Some(hit) = self.cascade(frame, None, trace) {
            return Some(hit);
        }

        for factor in self.admissible_scales(frame.width(), frame.height()) {
            let scaled = match transform::rescale(frame, factor) {
                Ok(scaled) => scaled,
                Err(e) => {
                    warn!("skipping rescale x{}: {}", factor, e);
                    continue;
                }
            };
            if let Some(hit) = self.run_engines(&scaled, Stage::Rescaled(factor), None, trace) {
                return Some(hit);
            }
        }

        let tiles = self.tile_plan(frame.width(), frame.height());
        if !tiles.is_empty() {
            debug!("tiled scan over {} tiles", tiles.len());
        }
        for tile in tiles {
            let view = match frame.crop(tile.x, tile.y, tile.width, tile.height) {
                Ok(view) => view,
                Err(e) => {
                    warn!("skipping tile at {},{}: {}", tile.x, tile.y, e);
                    continue;
                }
            };
            if let Some(hit) = self.cascade(&view, Some((tile.x, tile.y)), trace) {
                return Some(hit);
            }
        }
        None
    }

    /// Raw frame, then each transform of it; a transform that fails is skipped
    fn cascade(
        &self,
        frame: &Frame,
        tile: Option<(usize, usize)>,
        trace: &mut PipelineTrace,
    ) -> Option<DetectionResult> {
        if let Some(hit) = self.run_engines(frame, Stage::Raw, tile, trace) {
            return Some(hit);
        }
        for &kind in &self.config.transforms {
            let variant = match kind.apply(frame, &self.params) {
                Ok(variant) => variant,
                Err(e) => {
                    warn!("skipping {} transform: {}", kind, e);
                    continue;
                }
            };
            if let Some(hit) = self.run_engines(&variant, Stage::Transformed(kind), tile, trace) {
                return Some(hit);
            }
        }
        None
    }

    fn run_engines(
        &self,
        frame: &Frame,
        stage: Stage,
        tile: Option<(usize, usize)>,
        trace: &mut PipelineTrace,
    ) -> Option<DetectionResult> {
        for engine in self.engines.available() {
            let attempt = Attempt {
                engine: engine.kind(),
                stage,
                tile,
            };
            trace.record(attempt);

            let hit = engine
                .attempt(frame)
                .and_then(|text| DetectionResult::new(text, engine.kind(), stage));
            match hit {
                Some(result) => {
                    return Some(match tile {
                        Some((x, y)) => result.within_tile(x, y),
                        None => result,
                    });
                }
                None => debug!("{}: nothing", attempt),
            }
        }
        None
    }
}

impl Detect for Pipeline {
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, FrameError> {
        Pipeline::detect(self, frame)
    }
}

impl<F> Detect for F
where
    F: Fn(&Frame) -> Result<Option<DetectionResult>, FrameError> + Send + Sync,
{
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, FrameError> {
        self(frame)
    }
}
