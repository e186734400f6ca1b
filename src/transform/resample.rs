/// Lanczos3 resampling through the `image` crate
use crate::error::FrameError;
use crate::models::{Frame, PixelFormat};
use image::imageops::{self, FilterType};

/// Largest side a rescale may produce
pub const MAX_SIDE: usize = 16384;

/// Scale both sides by `factor`, keeping the pixel format
pub fn rescale(frame: &Frame, factor: f32) -> Result<Frame, FrameError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(FrameError::InvalidParameter(format!(
            "rescale factor must be finite and positive, got {}",
            factor
        )));
    }
    let width = scaled_side(frame.width(), factor);
    let height = scaled_side(frame.height(), factor);
    resize_to(frame, width, height)
}

/// Resample to exact dimensions
pub fn resize_to(frame: &Frame, width: usize, height: usize) -> Result<Frame, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::ZeroDimension { width, height });
    }
    if width > MAX_SIDE || height > MAX_SIDE {
        return Err(FrameError::InvalidParameter(format!(
            "rescaled size {}x{} exceeds {}",
            width, height, MAX_SIDE
        )));
    }
    if width == frame.width() && height == frame.height() {
        return Ok(frame.clone());
    }

    let (w, h) = (width as u32, height as u32);
    match frame.format() {
        PixelFormat::Rgb8 => {
            Frame::try_from(imageops::resize(&frame.to_rgb_image(), w, h, FilterType::Lanczos3))
        }
        PixelFormat::Luma8 => {
            Frame::try_from(imageops::resize(&frame.to_gray_image(), w, h, FilterType::Lanczos3))
        }
    }
}

/// Side length after scaling, never below one pixel
pub fn scaled_side(side: usize, factor: f32) -> usize {
    ((side as f64 * factor as f64).round() as usize).max(1)
}
