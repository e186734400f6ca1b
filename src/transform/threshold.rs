/// Global (Otsu) and local (Gaussian adaptive) binarization
///
/// Outputs are `Luma8` frames holding only 0 (dark) and 255 (light).
use crate::error::FrameError;
use crate::models::{BitMatrix, Frame};
use rayon::prelude::*;

/// Otsu's threshold: the last intensity of the dark class
pub fn otsu_level(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_dark = 0.0f64;
    let mut sum_dark = 0.0f64;
    let mut best_variance = -1.0f64;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_dark += count as f64;
        if weight_dark == 0.0 {
            continue;
        }
        let weight_light = total - weight_dark;
        if weight_light == 0.0 {
            break;
        }
        sum_dark += level as f64 * count as f64;

        let mean_dark = sum_dark / weight_dark;
        let mean_light = (sum_all - sum_dark) / weight_light;
        let variance = weight_dark * weight_light * (mean_dark - mean_light).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Binarize with a single automatically chosen threshold
pub fn otsu_threshold(frame: &Frame) -> Result<Frame, FrameError> {
    let gray = frame.luma();
    let level = otsu_level(&gray);
    let data = gray.iter().map(|&v| if v <= level { 0 } else { 255 }).collect();
    Frame::from_luma(frame.width(), frame.height(), data)
}

/// Binarize each pixel against a Gaussian-weighted mean of its
/// `block_size` x `block_size` neighbourhood minus `c`
pub fn adaptive_threshold(frame: &Frame, block_size: usize, c: i32) -> Result<Frame, FrameError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(FrameError::InvalidParameter(format!(
            "adaptive block size must be odd and >= 3, got {}",
            block_size
        )));
    }

    let (width, height) = (frame.width(), frame.height());
    let gray = frame.luma();
    let kernel = gaussian_kernel(block_size);
    let mean = separable_blur(&gray, width, height, &kernel);

    let data = gray
        .iter()
        .zip(mean.iter())
        .map(|(&v, &m)| if v as i32 > m as i32 - c { 255 } else { 0 })
        .collect();
    Frame::from_luma(width, height, data)
}

/// Pack a frame into a bit grid, dark where luminance is at or below `level`
pub fn binarize_at(gray: &[u8], width: usize, height: usize, level: u8) -> BitMatrix {
    BitMatrix::from_fn(width, height, |x, y| gray[y * width + x] <= level)
}

fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Horizontal then vertical pass with replicated borders
fn separable_blur(src: &[u8], width: usize, height: usize, kernel: &[f32]) -> Vec<u8> {
    let half = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let line = &src[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half).clamp(0, width as isize - 1);
                    acc += w * line[sx as usize] as f32;
                }
                *out = acc;
            }
        });

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, dst) in row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half).clamp(0, height as isize - 1);
                acc += w * horizontal[sy as usize * width + x];
            }
            *dst = acc.round().clamp(0.0, 255.0) as u8;
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otsu_separates_two_classes() {
        let mut gray = vec![50u8; 50];
        gray.extend(vec![200u8; 50]);
        let level = otsu_level(&gray);
        assert!((50..200).contains(&level));

        let frame = Frame::from_luma(10, 10, gray).unwrap();
        let binary = otsu_threshold(&frame).unwrap();
        assert_eq!(binary.as_bytes()[0], 0);
        assert_eq!(binary.as_bytes()[99], 255);
    }

    #[test]
    fn test_adaptive_rejects_even_block() {
        let frame = Frame::filled(4, 4, 10).unwrap();
        assert!(matches!(
            adaptive_threshold(&frame, 10, 2),
            Err(FrameError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_adaptive_flat_region_is_light() {
        // v > mean - c holds everywhere on a flat image
        let frame = Frame::filled(16, 16, 90).unwrap();
        let binary = adaptive_threshold(&frame, 11, 2).unwrap();
        assert!(binary.as_bytes().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_adaptive_marks_dark_spot() {
        let mut gray = vec![220u8; 21 * 21];
        gray[10 * 21 + 10] = 20;
        let frame = Frame::from_luma(21, 21, gray).unwrap();
        let binary = adaptive_threshold(&frame, 11, 2).unwrap();
        assert_eq!(binary.as_bytes()[10 * 21 + 10], 0);
        assert_eq!(binary.as_bytes()[0], 255);
    }

    #[test]
    fn test_kernel_is_normalised() {
        let kernel = gaussian_kernel(11);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(kernel[5] > kernel[0]);
    }
}
