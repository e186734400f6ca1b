/// Perspective mapping between symbol module space and image space
use crate::models::Point;

/// Projective 3x3 transform with the last coefficient fixed at 1
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    m: [f64; 8],
}

impl PerspectiveTransform {
    /// Transform that maps each `src[i]` onto `dst[i]`; `None` for degenerate quads
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(a, b).map(|m| Self { m })
    }

    /// Apply the transform to a point
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let m = &self.m;

        let denominator = m[6] * x + m[7] * y + 1.0;
        if denominator.abs() < 1e-12 {
            return Point::new(f32::NAN, f32::NAN);
        }

        Point::new(
            ((m[0] * x + m[1] * y + m[2]) / denominator) as f32,
            ((m[3] * x + m[4] * y + m[5]) / denominator) as f32,
        )
    }
}

/// Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    let n = 8;

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > a[max_row][i].abs() {
                max_row = k;
            }
        }
        if a[max_row][i].abs() < 1e-12 {
            return None;
        }
        a.swap(i, max_row);
        b.swap(i, max_row);

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_transform() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(0.0, 50.0),
        ];

        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0));
        assert!((p.x - 25.0).abs() < 1e-3 && (p.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_square_maps_onto_skewed_quad() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(21.0, 0.0),
            Point::new(21.0, 21.0),
            Point::new(0.0, 21.0),
        ];
        let quad = [
            Point::new(10.0, 12.0),
            Point::new(90.0, 8.0),
            Point::new(95.0, 96.0),
            Point::new(6.0, 88.0),
        ];
        let t = PerspectiveTransform::from_points(&square, &quad).unwrap();
        let p = t.transform(&Point::new(21.0, 21.0));
        assert!(p.distance(&quad[2]) < 1e-2);
    }

    #[test]
    fn test_degenerate_quad() {
        let p = Point::new(1.0, 1.0);
        assert!(PerspectiveTransform::from_points(&[p; 4], &[p; 4]).is_none());
    }
}
