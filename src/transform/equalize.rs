/// Contrast-limited adaptive histogram equalization (CLAHE)
use crate::error::FrameError;
use crate::models::Frame;
use rayon::prelude::*;

/// Equalize the luminance plane over a `grid` x `grid` tile layout
///
/// Each tile's histogram is clipped at `clip_limit` times the mean bin
/// height, the excess spread evenly over all bins, and pixels are mapped by
/// bilinear interpolation between the four nearest tile lookup tables.
pub fn contrast_equalize(frame: &Frame, clip_limit: f32, grid: usize) -> Result<Frame, FrameError> {
    if grid == 0 {
        return Err(FrameError::InvalidParameter("CLAHE grid must be non-zero".into()));
    }
    if !clip_limit.is_finite() || clip_limit <= 0.0 {
        return Err(FrameError::InvalidParameter(format!(
            "CLAHE clip limit must be positive, got {}",
            clip_limit
        )));
    }

    let (width, height) = (frame.width(), frame.height());
    let gray = frame.luma();

    let tile_w = width.div_ceil(grid.min(width));
    let tile_h = height.div_ceil(grid.min(height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let luts: Vec<[u8; 256]> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|i| {
            let (tx, ty) = (i % tiles_x, i / tiles_x);
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            tile_lut(&gray, width, x0, y0, x1, y1, clip_limit)
        })
        .collect();

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        for (x, dst) in row.iter_mut().enumerate() {
            let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
            let v = gray[y * width + x] as usize;

            let top = lerp(luts[ty0 * tiles_x + tx0][v], luts[ty0 * tiles_x + tx1][v], ax);
            let bottom = lerp(luts[ty1 * tiles_x + tx0][v], luts[ty1 * tiles_x + tx1][v], ax);
            *dst = (top + (bottom - top) * ay).round().clamp(0.0, 255.0) as u8;
        }
    });

    Frame::from_luma(width, height, out)
}

fn tile_lut(
    gray: &[u8],
    stride: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    clip_limit: f32,
) -> [u8; 256] {
    let mut histogram = [0usize; 256];
    for y in y0..y1 {
        for &v in &gray[y * stride + x0..y * stride + x1] {
            histogram[v as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    let clip = ((clip_limit * area as f32 / 256.0) as usize).max(1);

    let mut excess = 0usize;
    for bin in histogram.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let remainder = excess % 256;
    for (i, bin) in histogram.iter_mut().enumerate() {
        *bin += share + usize::from(i < remainder);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0usize;
    for (i, &count) in histogram.iter().enumerate() {
        cdf += count;
        lut[i] = ((cdf as f32 * 255.0 / area as f32).round()).min(255.0) as u8;
    }
    lut
}

/// Indices of the two tiles whose centres bracket `pos`, and the weight of the second
fn neighbours(pos: usize, tile: usize, tiles: usize) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let t0 = (f.floor() as usize).min(tiles - 1);
    let t1 = (t0 + 1).min(tiles - 1);
    let weight = if t0 == t1 { 0.0 } else { f - t0 as f32 };
    (t0, t1, weight)
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}
