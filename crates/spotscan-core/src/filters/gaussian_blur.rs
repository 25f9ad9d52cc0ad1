use ndarray::{ArrayD, ArrayView1, ArrayViewMut1, Axis, Zip};

use crate::consts::{GAUSSIAN_KERNEL_SIGMAS, PARALLEL_VOXEL_THRESHOLD};

/// Sigmas at or below this are treated as "no blur".
const MIN_SIGMA: f64 = 1e-3;

/// Separable Gaussian blur with a per-axis sigma, clamping at the borders.
///
/// Axes with a negligible sigma are left untouched.
pub fn gaussian_blur_volume(data: &ArrayD<f32>, sigmas: &[f64]) -> ArrayD<f32> {
    let mut current = data.clone();
    for (axis, &sigma) in sigmas.iter().enumerate().take(data.ndim()) {
        if sigma > MIN_SIGMA {
            current = gaussian_blur_axis(&current, axis, sigma);
        }
    }
    current
}

/// 1D Gaussian blur along a single axis.
pub fn gaussian_blur_axis(data: &ArrayD<f32>, axis: usize, sigma: f64) -> ArrayD<f32> {
    let kernel = make_gaussian_kernel(sigma);
    let mut result = ArrayD::<f32>::zeros(data.raw_dim());

    let zip = Zip::from(result.lanes_mut(Axis(axis))).and(data.lanes(Axis(axis)));
    if data.len() >= PARALLEL_VOXEL_THRESHOLD {
        zip.par_for_each(|out, lane| convolve_lane(lane, out, &kernel));
    } else {
        zip.for_each(|out, lane| convolve_lane(lane, out, &kernel));
    }

    result
}

/// Normalised 1D Gaussian of radius `ceil(3 sigma)` (at least 1).
pub fn make_gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = ((sigma * GAUSSIAN_KERNEL_SIGMAS).ceil() as usize).max(1);
    let size = 2 * radius + 1;
    let s2 = 2.0 * sigma * sigma;

    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    kernel.into_iter().map(|v| v as f32).collect()
}

fn convolve_lane(lane: ArrayView1<f32>, mut out: ArrayViewMut1<f32>, kernel: &[f32]) {
    let n = lane.len() as isize;
    let radius = (kernel.len() / 2) as isize;

    for (i, o) in out.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let src = (i as isize + ki as isize - radius).clamp(0, n - 1) as usize;
            sum += lane[src] * kv;
        }
        *o = sum;
    }
}
