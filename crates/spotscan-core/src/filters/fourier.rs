//! N-dimensional FFT convolution.
//!
//! Both operands are zero-padded to `n + k - 1` samples per axis so the
//! circular convolution computed in the frequency domain equals the linear
//! one over the original extent.

use ndarray::{ArrayD, ArrayViewMut1, Axis, IxDyn, Zip};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::consts::PARALLEL_VOXEL_THRESHOLD;
use crate::error::{Result, SpotError};

/// Convolve `data` with an odd-sized `kernel` centred on its middle sample.
///
/// The output has the extent of `data`; samples outside `data` count as zero.
pub fn fft_convolve(data: &ArrayD<f32>, kernel: &ArrayD<f32>) -> Result<ArrayD<f32>> {
    if kernel.ndim() != data.ndim() || kernel.shape().iter().any(|&k| k % 2 == 0) {
        return Err(SpotError::IncompatibleShapes {
            volume: data.shape().to_vec(),
            kernel: kernel.shape().to_vec(),
        });
    }

    let padded_shape: Vec<usize> = data
        .shape()
        .iter()
        .zip(kernel.shape())
        .map(|(&n, &k)| n + k - 1)
        .collect();

    let mut spectrum = ArrayD::<Complex<f64>>::zeros(IxDyn(&padded_shape));
    for (idx, &v) in data.indexed_iter() {
        spectrum[idx] = Complex::new(v as f64, 0.0);
    }

    // Kernel centre goes to the origin, negative offsets wrap to the end.
    let mut kernel_spectrum = ArrayD::<Complex<f64>>::zeros(IxDyn(&padded_shape));
    let mut wrapped = IxDyn(&padded_shape);
    for (idx, &v) in kernel.indexed_iter() {
        for axis in 0..kernel.ndim() {
            let radius = (kernel.shape()[axis] / 2) as isize;
            let p = padded_shape[axis] as isize;
            wrapped[axis] = (idx[axis] as isize - radius).rem_euclid(p) as usize;
        }
        kernel_spectrum[&wrapped] = Complex::new(v as f64, 0.0);
    }

    fft_nd(&mut spectrum, false);
    fft_nd(&mut kernel_spectrum, false);
    Zip::from(&mut spectrum)
        .and(&kernel_spectrum)
        .for_each(|a, &b| *a *= b);
    fft_nd(&mut spectrum, true);

    let result = ArrayD::from_shape_fn(data.raw_dim(), |idx| spectrum[idx].re as f32);
    if result.iter().any(|v| !v.is_finite()) {
        return Err(SpotError::NumericalFailure("fft convolution"));
    }
    Ok(result)
}

/// In-place N-d FFT, one axis at a time. The inverse transform is scaled by
/// `1 / len` so that a forward/inverse pair is the identity.
pub fn fft_nd(data: &mut ArrayD<Complex<f64>>, inverse: bool) {
    let mut planner = FftPlanner::new();
    let parallel = data.len() >= PARALLEL_VOXEL_THRESHOLD;

    for axis in 0..data.ndim() {
        let n = data.shape()[axis];
        if n < 2 {
            continue;
        }
        let fft = if inverse {
            planner.plan_fft_inverse(n)
        } else {
            planner.plan_fft_forward(n)
        };

        let lanes = Zip::from(data.lanes_mut(Axis(axis)));
        if parallel {
            lanes.par_for_each(|lane| transform_lane(lane, &fft));
        } else {
            lanes.for_each(|lane| transform_lane(lane, &fft));
        }
    }

    if inverse {
        let scale = 1.0 / data.len() as f64;
        data.mapv_inplace(|v| v * scale);
    }
}

fn transform_lane(mut lane: ArrayViewMut1<Complex<f64>>, fft: &Arc<dyn Fft<f64>>) {
    let mut buffer: Vec<Complex<f64>> = lane.iter().copied().collect();
    fft.process(&mut buffer);
    for (dst, src) in lane.iter_mut().zip(buffer) {
        *dst = src;
    }
}
