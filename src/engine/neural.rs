/// Learned localizer followed by crop-and-decode
use super::Backend;
use super::geometric::GeometricEngine;
use crate::error::EngineError;
use crate::models::{EngineKind, Frame, Region};
use crate::transform::resample::{self, rescale};

/// A proposed code location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    /// Box in frame pixel coordinates
    pub region: Region,
    /// Localizer confidence in [0, 1]
    pub confidence: f32,
}

/// Proposes bounding boxes that likely contain a code
pub trait Localizer: Send + Sync {
    /// Boxes for one frame, any order
    fn locate(&self, frame: &Frame) -> Result<Vec<Proposal>, EngineError>;
}

/// Neural engine: localize, crop with padding, upscale, read
pub struct NeuralEngine {
    localizer: Result<Box<dyn Localizer>, String>,
    reader: GeometricEngine,
    padding: f32,
    min_side: usize,
}

impl NeuralEngine {
    /// Engine backed by a working localizer
    pub fn new(localizer: Box<dyn Localizer>) -> Self {
        Self {
            localizer: Ok(localizer),
            reader: GeometricEngine::new(),
            padding: 0.15,
            min_side: 256,
        }
    }

    /// Engine whose localizer could not be created; its probe fails with `reason`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            localizer: Err(reason.into()),
            reader: GeometricEngine::new(),
            padding: 0.15,
            min_side: 256,
        }
    }

    /// Padding added around each box, as a fraction of its longer side
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding.max(0.0);
        self
    }

    /// Crops shorter than this are upscaled before reading
    pub fn with_min_side(mut self, min_side: usize) -> Self {
        self.min_side = min_side.max(1);
        self
    }

    /// Build from configuration: loads the TorchScript model when the
    /// `neural` feature is enabled and a model path is set
    pub fn from_config(config: &crate::config::NeuralConfig) -> Self {
        #[cfg(feature = "neural")]
        let engine = match &config.model_path {
            Some(path) => {
                match torch::TorchLocalizer::load(path, config.input_size, config.confidence) {
                    Ok(localizer) => NeuralEngine::new(Box::new(localizer)),
                    Err(err) => NeuralEngine::unavailable(err.to_string()),
                }
            }
            None => NeuralEngine::unavailable("no model path configured"),
        };
        #[cfg(not(feature = "neural"))]
        let engine = NeuralEngine::unavailable("built without the `neural` feature");

        engine
            .with_padding(config.padding)
            .with_min_side(config.min_side)
    }

    fn read_proposal(
        &self,
        frame: &Frame,
        proposal: &Proposal,
    ) -> Result<Option<String>, EngineError> {
        let bounds = Region::new(0, 0, frame.width() as u32, frame.height() as u32)
            .ok_or_else(|| self.failure("frame has no area"))?;
        let longer = proposal.region.width.max(proposal.region.height) as f32;
        let pad = (longer * self.padding).round() as u32;
        let Some(area) = proposal.region.padded(pad).clamp_to(&bounds) else {
            return Ok(None);
        };

        let (x, y) = (area.x as usize, area.y as usize);
        let crop = frame
            .crop(x, y, area.width as usize, area.height as usize)
            .map_err(|e| self.failure(e.to_string()))?;

        let crop = if crop.min_side() < self.min_side {
            let factor = self.min_side as f32 / crop.min_side() as f32;
            let capped = factor.min(resample::MAX_SIDE as f32 / crop.max_side() as f32);
            rescale(&crop, capped).map_err(|e| self.failure(e.to_string()))?
        } else {
            crop
        };

        self.reader.decode(&crop)
    }

    fn failure(&self, reason: impl Into<String>) -> EngineError {
        EngineError::DecodeFailed {
            engine: EngineKind::Neural,
            reason: reason.into(),
        }
    }
}

impl Backend for NeuralEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Neural
    }

    fn probe(&self) -> Result<(), EngineError> {
        match &self.localizer {
            Ok(_) => Ok(()),
            Err(reason) => Err(EngineError::Unavailable {
                engine: EngineKind::Neural,
                reason: reason.clone(),
            }),
        }
    }

    fn decode(&self, frame: &Frame) -> Result<Option<String>, EngineError> {
        let localizer = match &self.localizer {
            Ok(localizer) => localizer,
            Err(reason) => return Err(self.failure(reason.clone())),
        };

        let mut proposals = localizer.locate(frame)?;
        proposals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        log::trace!("neural: {} proposals", proposals.len());

        for proposal in &proposals {
            if let Some(text) = self.read_proposal(frame, proposal)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

#[cfg(feature = "neural")]
mod torch {
    use super::{Localizer, Proposal};
    use crate::error::EngineError;
    use crate::models::{EngineKind, Frame, PixelFormat, Region};
    use crate::transform::resize_to;
    use std::convert::TryFrom;
    use std::path::Path;
    use std::sync::Mutex;
    use tch::{CModule, Device, Kind, Tensor};

    /// YOLO-style TorchScript detector: output `[1, C, N]`, rows `[cx, cy, w, h, conf, ...]`
    pub struct TorchLocalizer {
        module: Mutex<CModule>,
        device: Device,
        input_size: i64,
        confidence: f32,
    }

    impl TorchLocalizer {
        /// Load the module onto the best available device
        pub fn load(path: &Path, input_size: u32, confidence: f32) -> Result<Self, EngineError> {
            let device = Device::cuda_if_available();
            let module =
                CModule::load_on_device(path, device).map_err(|e| EngineError::Unavailable {
                    engine: EngineKind::Neural,
                    reason: format!("{}: {}", path.display(), e),
                })?;
            Ok(Self {
                module: Mutex::new(module),
                device,
                input_size: input_size as i64,
                confidence,
            })
        }

        fn failure(reason: impl ToString) -> EngineError {
            EngineError::DecodeFailed {
                engine: EngineKind::Neural,
                reason: reason.to_string(),
            }
        }
    }

    impl Localizer for TorchLocalizer {
        fn locate(&self, frame: &Frame) -> Result<Vec<Proposal>, EngineError> {
            let n = self.input_size;
            let resized = resize_to(frame, n as usize, n as usize).map_err(Self::failure)?;
            let rgb = match resized.format() {
                PixelFormat::Rgb8 => resized.into_raw(),
                PixelFormat::Luma8 => resized.to_rgb_image().into_raw(),
            };

            let input = Tensor::from_slice(&rgb)
                .to_device(self.device)
                .to_kind(Kind::Float)
                .view([1, n, n, 3])
                .permute([0, 3, 1, 2])
                / 255.0;

            let output = {
                let module = self
                    .module
                    .lock()
                    .map_err(|_| Self::failure("model lock poisoned"))?;
                module.forward_ts(&[input]).map_err(Self::failure)?
            };
            let shape = output.size();
            if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
                return Err(Self::failure(format!("unexpected output shape {:?}", shape)));
            }

            let preds = output
                .to_device(Device::Cpu)
                .squeeze_dim(0)
                .permute([1, 0])
                .contiguous();
            let rows = Vec::<Vec<f32>>::try_from(&preds).map_err(Self::failure)?;

            let sx = frame.width() as f32 / n as f32;
            let sy = frame.height() as f32 / n as f32;
            Ok(rows
                .into_iter()
                .filter(|row| row.len() >= 5 && row[4] >= self.confidence)
                .filter_map(|row| {
                    let (w, h) = (row[2] * sx, row[3] * sy);
                    let region = Region::new(
                        (row[0] * sx - w / 2.0).round() as i32,
                        (row[1] * sy - h / 2.0).round() as i32,
                        w.round().max(1.0) as u32,
                        h.round().max(1.0) as u32,
                    )?;
                    Some(Proposal {
                        region,
                        confidence: row[4],
                    })
                })
                .collect())
        }
    }
}
