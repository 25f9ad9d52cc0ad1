use crate::volume::Volume;

/// Running sums over a set of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionStats {
    pub count: usize,
    pub sum: f64,
    pub sum_sq: f64,
}

impl RegionStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0)
    }
}

/// Statistics of the voxels within `radius` (physical units) of `center`
/// (pixel coordinates). Falls back to the nearest voxel when the ball
/// contains none.
pub fn sphere_stats(volume: &Volume, center: &[f64], radius: f64) -> RegionStats {
    let r2 = radius * radius;
    let mut stats = RegionStats::default();
    visit_ball(volume, center, radius, |dist2, value| {
        if dist2 <= r2 {
            stats.push(value);
        }
    });

    if stats.count == 0 {
        if let Some(v) = nearest_sample(volume, center) {
            stats.push(v as f64);
        }
    }
    stats
}

/// Statistics of the voxels strictly farther than `inner` and at most
/// `outer` physical units from `center`.
pub fn shell_stats(volume: &Volume, center: &[f64], inner: f64, outer: f64) -> RegionStats {
    let (inner2, outer2) = (inner * inner, outer * outer);
    let mut stats = RegionStats::default();
    visit_ball(volume, center, outer, |dist2, value| {
        if dist2 > inner2 && dist2 <= outer2 {
            stats.push(value);
        }
    });
    stats
}

/// Sample of the voxel nearest to `position`, clamped into the grid.
pub fn nearest_sample(volume: &Volume, position: &[f64]) -> Option<f32> {
    if position.len() != volume.ndim() {
        return None;
    }
    let coord: Vec<usize> = position
        .iter()
        .zip(volume.shape())
        .map(|(&p, &n)| (p.round().max(0.0) as usize).min(n - 1))
        .collect();
    volume.get(&coord)
}

/// Call `f(squared physical distance, sample)` for every voxel in the
/// bounding box of the ball of `radius` around `center`.
fn visit_ball(volume: &Volume, center: &[f64], radius: f64, mut f: impl FnMut(f64, f64)) {
    let shape = volume.shape();
    let calibration = volume.calibration();
    let ndim = shape.len();
    if center.len() != ndim {
        return;
    }

    let mut lo = vec![0usize; ndim];
    let mut hi = vec![0usize; ndim];
    for axis in 0..ndim {
        let reach = radius / calibration[axis];
        let start = (center[axis] - reach).ceil().max(0.0);
        let end = (center[axis] + reach).floor().min((shape[axis] - 1) as f64);
        if end < start {
            return;
        }
        lo[axis] = start as usize;
        hi[axis] = end as usize;
    }

    let grid = volume.grid();
    let samples = volume.samples();
    let mut coord = lo.clone();
    loop {
        let dist2: f64 = (0..ndim)
            .map(|axis| ((coord[axis] as f64 - center[axis]) * calibration[axis]).powi(2))
            .sum();
        f(dist2, samples[grid.index_of(&coord)] as f64);

        // Odometer step over the box, last axis fastest.
        let mut axis = ndim;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            if coord[axis] < hi[axis] {
                coord[axis] += 1;
                break;
            }
            coord[axis] = lo[axis];
        }
    }
}
