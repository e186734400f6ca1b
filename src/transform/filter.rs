/// Point and neighbourhood filters: sharpen, invert
use crate::error::FrameError;
use crate::models::{Frame, PixelFormat};
use rayon::prelude::*;

/// 3x3 sharpening kernel, centre 9 and all neighbours -1
const SHARPEN: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Convolve the luminance plane with [`SHARPEN`], clamping to 0..=255
pub fn sharpen(frame: &Frame) -> Result<Frame, FrameError> {
    let (width, height) = (frame.width(), frame.height());
    let gray = frame.luma();

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, dst) in row.iter_mut().enumerate() {
            let mut acc = 0i32;
            for (ky, kernel_row) in SHARPEN.iter().enumerate() {
                let sy = (y as isize + ky as isize - 1).clamp(0, height as isize - 1) as usize;
                for (kx, &weight) in kernel_row.iter().enumerate() {
                    let sx = (x as isize + kx as isize - 1).clamp(0, width as isize - 1) as usize;
                    acc += weight * gray[sy * width + sx] as i32;
                }
            }
            *dst = acc.clamp(0, 255) as u8;
        }
    });

    Frame::from_luma(width, height, out)
}

/// Photometric negative; keeps the input pixel format
pub fn invert(frame: &Frame) -> Result<Frame, FrameError> {
    let data = frame.as_bytes().iter().map(|&v| 255 - v).collect();
    match frame.format() {
        PixelFormat::Rgb8 => Frame::from_rgb(frame.width(), frame.height(), data),
        PixelFormat::Luma8 => Frame::from_luma(frame.width(), frame.height(), data),
    }
}
