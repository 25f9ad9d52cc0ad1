use ndarray::{ArrayD, IxDyn};

use spotscan_core::frame::Stack;
use spotscan_core::volume::Volume;

/// Deterministic xorshift64 generator so noisy fixtures are reproducible.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform sample in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Sum of isotropic Gaussian blobs `amplitude * exp(-r^2 / (2 sigma^2))`.
pub fn gaussian_blobs(shape: &[usize], centres: &[Vec<f64>], sigma: f64, amplitude: f64) -> ArrayD<f32> {
    let s2 = 2.0 * sigma * sigma;
    ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        centres
            .iter()
            .map(|c| {
                let r2: f64 = c
                    .iter()
                    .enumerate()
                    .map(|(axis, &p)| (idx[axis] as f64 - p).powi(2))
                    .sum();
                amplitude * (-r2 / s2).exp()
            })
            .sum::<f64>() as f32
    })
}

/// Add uniform noise in `[0, amplitude)` inside the box `lo..hi`.
pub fn add_noise_box(data: &mut ArrayD<f32>, lo: &[usize], hi: &[usize], amplitude: f32, seed: u64) {
    let mut rng = XorShift::new(seed);
    for (idx, v) in data.indexed_iter_mut() {
        let inside = (0..lo.len()).all(|axis| idx[axis] >= lo[axis] && idx[axis] < hi[axis]);
        if inside {
            *v += amplitude * rng.next_f32();
        }
    }
}

/// Single-peak volume: zeros with `value` at `at`.
pub fn impulse(shape: &[usize], at: &[usize], value: f32) -> ArrayD<f32> {
    let mut data = ArrayD::zeros(IxDyn(shape));
    data[IxDyn(at)] = value;
    data
}

pub fn unit_volume(data: ArrayD<f32>) -> Volume {
    Volume::new(data, &[1.0, 1.0, 1.0]).unwrap()
}

/// Pack `[x, y]` or `[x, y, z]` frames into a stack in acquisition order.
pub fn stack_from_frames(frames: &[ArrayD<f32>], calibration: [f64; 3]) -> Stack {
    let shape = frames[0].shape();
    let (w, h) = (shape[0], shape[1]);
    let d = shape.get(2).copied().unwrap_or(1);

    let mut samples = Vec::with_capacity(w * h * d * frames.len());
    for frame in frames {
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    let v = if frame.ndim() == 3 {
                        frame[IxDyn(&[x, y, z])]
                    } else {
                        frame[IxDyn(&[x, y])]
                    };
                    samples.push(v);
                }
            }
        }
    }
    Stack::new(samples, w, h, d, frames.len(), calibration).unwrap()
}
