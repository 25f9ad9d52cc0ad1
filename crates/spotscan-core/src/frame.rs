use ndarray::{ArrayD, IxDyn};
use num_traits::AsPrimitive;
use tracing::debug;

use crate::error::{Result, SpotError};
use crate::volume::Volume;

/// A calibrated multi-frame acquisition: `num_frames` time points of
/// `num_slices` z-planes each.
///
/// Slices are stored back to back, slice `s = frame * num_slices + z`, each
/// slice row-major (`y * width + x`).
#[derive(Clone, Debug)]
pub struct Stack {
    samples: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub num_slices: usize,
    pub num_frames: usize,
    /// Physical voxel size: `[pixel width, pixel height, voxel depth]`.
    pub calibration: [f64; 3],
}

impl Stack {
    pub fn new(
        samples: Vec<f32>,
        width: usize,
        height: usize,
        num_slices: usize,
        num_frames: usize,
        calibration: [f64; 3],
    ) -> Result<Self> {
        if width == 0 || height == 0 || num_slices == 0 || num_frames == 0 {
            return Err(SpotError::InvalidDimensions(vec![
                width, height, num_slices, num_frames,
            ]));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(num_slices))
            .and_then(|n| n.checked_mul(num_frames))
            .ok_or_else(|| {
                SpotError::InvalidDimensions(vec![width, height, num_slices, num_frames])
            })?;
        if samples.len() != expected {
            return Err(SpotError::InvalidParameter(format!(
                "stack holds {} samples, expected {}x{}x{}x{} = {}",
                samples.len(),
                width,
                height,
                num_slices,
                num_frames,
                expected
            )));
        }

        Ok(Self {
            samples,
            width,
            height,
            num_slices,
            num_frames,
            calibration,
        })
    }

    /// Build a stack from integer or float samples of any primitive type.
    pub fn from_raw<T: AsPrimitive<f32>>(
        raw: &[T],
        width: usize,
        height: usize,
        num_slices: usize,
        num_frames: usize,
        calibration: [f64; 3],
    ) -> Result<Self> {
        let samples = raw.iter().map(|v| v.as_()).collect();
        Self::new(samples, width, height, num_slices, num_frames, calibration)
    }

    pub fn slice_len(&self) -> usize {
        self.width * self.height
    }

    pub fn slice_count(&self) -> usize {
        self.num_slices * self.num_frames
    }

    /// Slice `index` in acquisition order.
    pub fn slice(&self, index: usize) -> Result<&[f32]> {
        let total = self.slice_count();
        if index >= total {
            return Err(SpotError::FrameIndexOutOfRange { index, total });
        }
        let len = self.slice_len();
        Ok(&self.samples[index * len..(index + 1) * len])
    }

    /// Dimensionality of the per-frame volumes.
    pub fn frame_ndim(&self) -> usize {
        if self.num_slices > 1 {
            3
        } else {
            2
        }
    }

    /// Volume for time point `frame`, built from its slices in order.
    ///
    /// A single slice per frame yields a 2D volume.
    pub fn frame(&self, frame: usize) -> Result<Volume> {
        if frame >= self.num_frames {
            return Err(SpotError::FrameIndexOutOfRange {
                index: frame,
                total: self.num_frames,
            });
        }

        let (w, h, d) = (self.width, self.height, self.num_slices);
        let first = frame * d * self.slice_len();
        let frame_samples = &self.samples[first..first + d * self.slice_len()];

        let data = if self.frame_ndim() == 3 {
            ArrayD::from_shape_fn(IxDyn(&[w, h, d]), |idx| {
                frame_samples[idx[2] * w * h + idx[1] * w + idx[0]]
            })
        } else {
            ArrayD::from_shape_fn(IxDyn(&[w, h]), |idx| frame_samples[idx[1] * w + idx[0]])
        };

        Volume::new(data, &self.calibration)
    }

    /// Split the stack into one volume per time point, in temporal order.
    pub fn split_frames(&self) -> Result<Vec<Volume>> {
        debug!(
            frames = self.num_frames,
            slices = self.num_slices,
            "Splitting stack into frames"
        );
        (0..self.num_frames).map(|i| self.frame(i)).collect()
    }
}
