//! Core value types shared by every stage

pub mod frame;
pub mod matrix;
pub mod point;
pub mod region;
pub mod result;

pub use frame::{Frame, PixelFormat};
pub use matrix::BitMatrix;
pub use point::Point;
pub use region::Region;
pub use result::{DetectionResult, EngineKind, Stage};
