use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;

use crate::consts::PARALLEL_VOXEL_THRESHOLD;
use crate::error::{Result, SpotError};
use crate::volume::Volume;

/// 3x3 in-plane median filter for salt-and-pepper noise.
///
/// 3D volumes are filtered plane by plane (3x3x1 neighbourhood). Borders are
/// mirrored.
pub fn median_filter(volume: &Volume) -> Result<Volume> {
    let grid = volume.grid();
    let shape = grid.shape().to_vec();
    let samples = volume.samples();

    let filter_at = |index: usize| -> f32 {
        let mut coord = vec![0usize; grid.ndim()];
        grid.coord_of(index, &mut coord);
        let (x, y) = (coord[0], coord[1]);

        let mut window = [0.0f32; 9];
        let mut n = 0;
        for dy in -1..=1_isize {
            for dx in -1..=1_isize {
                coord[0] = mirror(x as isize + dx, shape[0]);
                coord[1] = mirror(y as isize + dy, shape[1]);
                window[n] = samples[grid.index_of(&coord)];
                n += 1;
            }
        }
        compute_median(&mut window)
    };

    let filtered: Vec<f32> = if grid.len() >= PARALLEL_VOXEL_THRESHOLD {
        (0..grid.len()).into_par_iter().map(filter_at).collect()
    } else {
        (0..grid.len()).map(filter_at).collect()
    };

    let data = ArrayD::from_shape_vec(IxDyn(&shape), filtered)
        .map_err(|_| SpotError::InvalidDimensions(shape.clone()))?;
    volume.with_data(data)
}

/// Reflect an out-of-range coordinate back into `0..n` without repeating
/// the edge sample.
fn mirror(c: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let c = if c < 0 { -c } else { c };
    let c = if c >= n { 2 * (n - 1) - c } else { c };
    c.clamp(0, n - 1) as usize
}

fn compute_median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
}
