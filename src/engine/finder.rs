/// Finder pattern location: 1:1:3:1:1 run scanning with cross-checks
use crate::models::{BitMatrix, Point};

/// Candidates kept after merging, strongest first
const MAX_CANDIDATES: usize = 12;

/// A located finder pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Centre in image coordinates
    pub center: Point,
    /// Estimated module size in pixels
    pub module_size: f32,
    /// Number of scan lines that confirmed it
    pub hits: usize,
}

impl FinderPattern {
    fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            hits: 1,
        }
    }

    fn absorb(&mut self, other: &FinderPattern) {
        let total = (self.hits + other.hits) as f32;
        let w_self = self.hits as f32 / total;
        let w_other = other.hits as f32 / total;
        self.center = Point::new(
            self.center.x * w_self + other.center.x * w_other,
            self.center.y * w_self + other.center.y * w_other,
        );
        self.module_size = self.module_size * w_self + other.module_size * w_other;
        self.hits += other.hits;
    }
}

/// Scan every row for finder runs, confirm each along the column and again
/// along the row, and merge nearby confirmations
pub fn find_patterns(matrix: &BitMatrix) -> Vec<FinderPattern> {
    let (width, height) = (matrix.width(), matrix.height());
    let mut merged: Vec<FinderPattern> = Vec::new();

    for y in 0..height {
        for (center_x, row_total) in scan_row(matrix, y) {
            let Some(pattern) = confirm(matrix, center_x, y, row_total, width, height) else {
                continue;
            };
            match merged.iter_mut().find(|m| same_pattern(m, &pattern)) {
                Some(existing) => existing.absorb(&pattern),
                None => merged.push(pattern),
            }
        }
    }

    merged.sort_by(|a, b| b.hits.cmp(&a.hits));
    merged.truncate(MAX_CANDIDATES);
    merged
}

fn same_pattern(a: &FinderPattern, b: &FinderPattern) -> bool {
    let reach = a.module_size.max(b.module_size) * 1.5;
    (a.center.x - b.center.x).abs() <= reach && (a.center.y - b.center.y).abs() <= reach
}

/// Centres (x) and total widths of dark-light-dark-light-dark runs in one row
fn scan_row(matrix: &BitMatrix, y: usize) -> Vec<(f32, usize)> {
    let width = matrix.width();
    let mut hits = Vec::new();
    let mut runs: Vec<usize> = Vec::new();
    let mut colors: Vec<bool> = Vec::new();
    let mut run_start = 0usize;
    let mut current = matrix.get(0, y);

    // x == width flushes the final run
    for x in 1..=width {
        let color = x < width && matrix.get(x, y);
        if x < width && color == current {
            continue;
        }
        runs.push(x - run_start);
        colors.push(current);
        run_start = x;
        current = color;

        let n = runs.len();
        if n >= 5 && colors[n - 5] && !colors[n - 4] {
            let window = [runs[n - 5], runs[n - 4], runs[n - 3], runs[n - 2], runs[n - 1]];
            if ratio_ok(&window) {
                let trailing = (window[4] + window[3]) as f32;
                let center = x as f32 - trailing - window[2] as f32 / 2.0;
                hits.push((center, window.iter().sum()));
            }
        }
    }
    hits
}

/// Run widths match 1:1:3:1:1 within half a module on the outer runs
/// and one module on the centre run
pub fn ratio_ok(counts: &[usize; 5]) -> bool {
    let total: usize = counts.iter().sum();
    if total < 7 || counts.contains(&0) {
        return false;
    }
    let unit = total as f32 / 7.0;
    let outer = unit * 0.5;
    (counts[0] as f32 - unit).abs() < outer
        && (counts[1] as f32 - unit).abs() < outer
        && (counts[2] as f32 - 3.0 * unit).abs() < unit
        && (counts[3] as f32 - unit).abs() < outer
        && (counts[4] as f32 - unit).abs() < outer
}

/// Vertical then horizontal cross-check through a row hit
fn confirm(
    matrix: &BitMatrix,
    center_x: f32,
    y: usize,
    row_total: usize,
    width: usize,
    height: usize,
) -> Option<FinderPattern> {
    let max_run = row_total;
    let cx = center_x.floor() as isize;

    let column = |i: isize| matrix.get(cx as usize, i as usize);
    let (center_y, v_total) = cross_check(column, height as isize, y as isize, max_run)?;
    let ratio = v_total as f32 / row_total as f32;
    if !(1.0 / 1.6..=1.6).contains(&ratio) {
        return None;
    }

    let cy = center_y.floor() as isize;
    let row = |i: isize| matrix.get(i as usize, cy as usize);
    let (refined_x, h_total) = cross_check(row, width as isize, cx, max_run)?;

    let module_size = (h_total + v_total) as f32 / 14.0;
    Some(FinderPattern::new(refined_x, center_y, module_size))
}

/// Walk outward from `start` along one axis counting the five runs
///
/// Returns the centre of the middle run and the total width.
pub fn cross_check(
    get: impl Fn(isize) -> bool,
    len: isize,
    start: isize,
    max_run: usize,
) -> Option<(f32, usize)> {
    if start < 0 || start >= len || !get(start) {
        return None;
    }
    let mut counts = [0usize; 5];

    let mut i = start;
    while i >= 0 && get(i) {
        counts[2] += 1;
        i -= 1;
    }
    while i >= 0 && !get(i) && counts[1] <= max_run {
        counts[1] += 1;
        i -= 1;
    }
    while i >= 0 && get(i) && counts[0] <= max_run {
        counts[0] += 1;
        i -= 1;
    }

    let mut i = start + 1;
    while i < len && get(i) {
        counts[2] += 1;
        i += 1;
    }
    while i < len && !get(i) && counts[3] <= max_run {
        counts[3] += 1;
        i += 1;
    }
    while i < len && get(i) && counts[4] <= max_run {
        counts[4] += 1;
        i += 1;
    }

    if !ratio_ok(&counts) {
        return None;
    }
    let center = (i - counts[4] as isize - counts[3] as isize) as f32 - counts[2] as f32 / 2.0;
    Some((center, counts.iter().sum()))
}

/// Three finder centres in symbol orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderTriplet {
    /// Corner finder
    pub top_left: Point,
    /// Finder along the first row
    pub top_right: Point,
    /// Finder along the first column
    pub bottom_left: Point,
    /// Mean module size of the three
    pub module_size: f32,
}

impl FinderTriplet {
    /// Order three patterns: the right-angle corner is top-left, and
    /// top-right is chosen so the symbol reads clockwise
    pub fn order(a: &FinderPattern, b: &FinderPattern, c: &FinderPattern) -> Option<Self> {
        let patterns = [a, b, c];
        if patterns.iter().any(|p| p.module_size < 0.5) {
            return None;
        }

        let mut best_idx = 0usize;
        let mut best_cos = f32::INFINITY;
        for i in 0..3 {
            let p = &patterns[i].center;
            let p1 = &patterns[(i + 1) % 3].center;
            let p2 = &patterns[(i + 2) % 3].center;
            let (v1x, v1y) = (p1.x - p.x, p1.y - p.y);
            let (v2x, v2y) = (p2.x - p.x, p2.y - p.y);
            let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
            if denom == 0.0 {
                continue;
            }
            let cos = ((v1x * v2x + v1y * v2y) / denom).abs();
            if cos < best_cos {
                best_cos = cos;
                best_idx = i;
            }
        }
        if best_cos > 0.4 {
            return None;
        }

        let tl = patterns[best_idx];
        let p1 = patterns[(best_idx + 1) % 3];
        let p2 = patterns[(best_idx + 2) % 3];
        let (tr, bl) = if tl.center.cross(&p1.center, &p2.center) > 0.0 {
            (p1, p2)
        } else {
            (p2, p1)
        };

        Some(Self {
            top_left: tl.center,
            top_right: tr.center,
            bottom_left: bl.center,
            module_size: (tl.module_size + tr.module_size + bl.module_size) / 3.0,
        })
    }

    /// Candidate symbol sizes from finder spacing, best estimate first
    pub fn dimension_candidates(&self) -> Vec<usize> {
        let span = (self.top_left.distance(&self.top_right)
            + self.top_left.distance(&self.bottom_left))
            / 2.0;
        let raw = span / self.module_size + 7.0;
        let version = ((raw - 17.0) / 4.0).round() as i32;

        [version, version - 1, version + 1]
            .into_iter()
            .filter(|v| (1..=40).contains(v))
            .map(|v| 17 + 4 * v as usize)
            .collect()
    }

    /// Consistency score of the triplet; lower is better
    pub fn score(&self) -> f32 {
        let d_tr = self.top_left.distance(&self.top_right);
        let d_bl = self.top_left.distance(&self.bottom_left);
        let skew = d_tr.max(d_bl) / d_tr.min(d_bl).max(f32::EPSILON);
        let cos = {
            let tl = self.top_left;
            let (ax, ay) = (self.top_right.x - tl.x, self.top_right.y - tl.y);
            let (bx, by) = (self.bottom_left.x - tl.x, self.bottom_left.y - tl.y);
            ((ax * bx + ay * by) / (d_tr * d_bl).max(f32::EPSILON)).abs()
        };
        skew + cos
    }
}

/// Plausible triplets among the candidates, best first
pub fn group_triplets(patterns: &[FinderPattern], limit: usize) -> Vec<FinderTriplet> {
    let mut triplets = Vec::new();
    for i in 0..patterns.len() {
        for j in i + 1..patterns.len() {
            for k in j + 1..patterns.len() {
                let (pi, pj, pk) = (&patterns[i], &patterns[j], &patterns[k]);
                let sizes = [pi.module_size, pj.module_size, pk.module_size];
                let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
                if max_size / min_size > 2.0 {
                    continue;
                }

                let Some(triplet) = FinderTriplet::order(pi, pj, pk) else {
                    continue;
                };
                let min_d = triplet
                    .top_left
                    .distance(&triplet.top_right)
                    .min(triplet.top_left.distance(&triplet.bottom_left));
                if min_d < triplet.module_size * 10.0 || triplet.score() > 2.0 {
                    continue;
                }
                triplets.push(triplet);
            }
        }
    }

    triplets.sort_by(|a, b| a.score().total_cmp(&b.score()));
    triplets.truncate(limit);
    triplets
}
