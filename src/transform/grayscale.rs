/// Luminance conversion, Y = (77*R + 150*G + 29*B) >> 8
use crate::error::FrameError;
use crate::models::{Frame, PixelFormat};
use rayon::prelude::*;

const COEF_R: u32 = 77;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Convert interleaved RGB bytes to a luminance plane, rows in parallel
pub fn rgb_to_luma(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src = &rgb[y * width * 3..(y + 1) * width * 3];
        for (dst, px) in row.iter_mut().zip(src.chunks_exact(3)) {
            let lum = COEF_R * px[0] as u32 + COEF_G * px[1] as u32 + COEF_B * px[2] as u32;
            *dst = (lum >> 8) as u8;
        }
    });

    gray
}

/// Grayscale frame; a `Luma8` input is copied unchanged
pub fn to_grayscale(frame: &Frame) -> Result<Frame, FrameError> {
    match frame.format() {
        PixelFormat::Luma8 => Ok(frame.clone()),
        PixelFormat::Rgb8 => Frame::from_luma(
            frame.width(),
            frame.height(),
            rgb_to_luma(frame.as_bytes(), frame.width(), frame.height()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_luma() {
        assert_eq!(rgb_to_luma(&[255, 255, 255], 1, 1), vec![255]);
        assert_eq!(rgb_to_luma(&[0, 0, 0], 1, 1), vec![0]);

        let red = rgb_to_luma(&[255, 0, 0], 1, 1)[0];
        let green = rgb_to_luma(&[0, 255, 0], 1, 1)[0];
        let blue = rgb_to_luma(&[0, 0, 255], 1, 1)[0];
        assert!(green > red && red > blue);
    }

    #[test]
    fn test_to_grayscale_keeps_dimensions() {
        let frame = Frame::filled(7, 3, 200).unwrap();
        let gray = to_grayscale(&frame).unwrap();
        assert_eq!(gray.format(), PixelFormat::Luma8);
        assert_eq!((gray.width(), gray.height()), (7, 3));
        assert!(gray.as_bytes().iter().all(|&v| v == 199 || v == 200));
    }
}
