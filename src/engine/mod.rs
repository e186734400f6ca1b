//! Decoding engines and the ranked set the pipeline drives
//!
//! Every engine answers one question: does this frame hold a readable code?
//! `Ok(None)` is the normal "not found" answer. Errors and panics are
//! contained by [`EngineSet`] and never reach the pipeline.

pub mod finder;
pub mod geometric;
pub mod linear;
pub mod neural;
mod set;

pub use geometric::GeometricEngine;
pub use linear::LinearEngine;
pub use neural::{Localizer, NeuralEngine, Proposal};
pub use set::{Engine, EngineSet};

use crate::error::EngineError;
use crate::models::{EngineKind, Frame};
use std::fmt;

/// A decoding backend
pub trait Backend: Send + Sync {
    /// Which engine family this is
    fn kind(&self) -> EngineKind;

    /// Display name; defaults to the kind's name
    fn name(&self) -> String {
        self.kind().name().to_string()
    }

    /// One-time startup check; a failure disables the engine for the set's lifetime
    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Attempt to decode one frame into at most one text
    fn decode(&self, frame: &Frame) -> Result<Option<String>, EngineError>;
}

/// Static description of an engine, as reported by the capability query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    /// Display name
    pub name: String,
    /// Engine family
    pub kind: EngineKind,
    /// Priority rank, lower runs first
    pub rank: u8,
    /// Result of the startup probe
    pub available: bool,
    /// Why the engine is unavailable
    pub reason: Option<String>,
}

impl fmt::Display for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}  {:<10}", self.rank, self.name)?;
        match (&self.reason, self.available) {
            (_, true) => f.write_str("available"),
            (Some(reason), false) => write!(f, "unavailable ({})", reason),
            (None, false) => f.write_str("unavailable"),
        }
    }
}
