use ndarray::{ArrayD, IxDyn};

use crate::error::{Result, SpotError};

/// A dense 2D or 3D sample grid with per-axis physical calibration.
///
/// Axis 0 is x (width), axis 1 is y (height), axis 2 is z (depth). Samples are
/// kept in standard (row-major) layout so stages can work on the flat buffer
/// through a [`Grid`].
#[derive(Clone, Debug)]
pub struct Volume {
    data: ArrayD<f32>,
    calibration: Vec<f64>,
}

impl Volume {
    /// Wrap an array as a volume. `calibration` must hold at least one entry
    /// per axis; extra entries (e.g. a depth for a 2D frame) are dropped.
    pub fn new(data: ArrayD<f32>, calibration: &[f64]) -> Result<Self> {
        let ndim = data.ndim();
        if !(2..=3).contains(&ndim) || data.shape().iter().any(|&n| n == 0) {
            return Err(SpotError::InvalidDimensions(data.shape().to_vec()));
        }
        if calibration.len() < ndim {
            return Err(SpotError::InvalidParameter(format!(
                "calibration has {} entries for a {}D volume",
                calibration.len(),
                ndim
            )));
        }
        let calibration = calibration[..ndim].to_vec();
        if let Some(bad) = calibration.iter().find(|c| !c.is_finite() || **c <= 0.0) {
            return Err(SpotError::InvalidParameter(format!(
                "calibration must be positive, got {bad}"
            )));
        }

        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };

        Ok(Self { data, calibration })
    }

    /// Build a volume from a flat buffer in standard layout.
    pub fn from_samples(shape: &[usize], samples: Vec<f32>, calibration: &[f64]) -> Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), samples)
            .map_err(|_| SpotError::InvalidDimensions(shape.to_vec()))?;
        Self::new(data, calibration)
    }

    /// All-zero volume.
    pub fn zeros(shape: &[usize], calibration: &[f64]) -> Result<Self> {
        Self::new(ArrayD::zeros(IxDyn(shape)), calibration)
    }

    /// New volume with the same calibration and different samples.
    pub fn with_data(&self, data: ArrayD<f32>) -> Result<Self> {
        Self::new(data, &self.calibration)
    }

    /// Same samples with a different calibration.
    pub fn with_calibration(self, calibration: &[f64]) -> Result<Self> {
        Self::new(self.data, calibration)
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn calibration(&self) -> &[f64] {
        &self.calibration
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Flat sample buffer in standard layout.
    pub fn samples(&self) -> &[f32] {
        // Constructors only ever store standard-layout arrays.
        self.data.as_slice().unwrap_or_default()
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.shape())
    }

    /// Sample at an integer coordinate, or `None` outside the grid.
    pub fn get(&self, coord: &[usize]) -> Option<f32> {
        if coord.len() != self.ndim() {
            return None;
        }
        self.data.get(IxDyn(coord)).copied()
    }

    /// `(min, max)` over all samples.
    pub fn value_range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Index arithmetic for a dense standard-layout grid.
///
/// The last axis varies fastest, matching `ndarray`'s default layout.
#[derive(Clone, Debug)]
pub struct Grid {
    shape: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl Grid {
    pub fn new(shape: &[usize]) -> Self {
        let mut strides = vec![0; shape.len()];
        let mut stride = 1;
        for axis in (0..shape.len()).rev() {
            strides[axis] = stride;
            stride *= shape[axis];
        }
        Self {
            shape: shape.to_vec(),
            strides,
            len: stride,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index_of(&self, coord: &[usize]) -> usize {
        coord
            .iter()
            .zip(&self.strides)
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Write the coordinate of flat `index` into `coord`.
    pub fn coord_of(&self, mut index: usize, coord: &mut [usize]) {
        for (axis, &stride) in self.strides.iter().enumerate() {
            coord[axis] = index / stride;
            index %= stride;
        }
    }

    pub fn on_boundary(&self, coord: &[usize]) -> bool {
        coord
            .iter()
            .zip(&self.shape)
            .any(|(&c, &n)| c == 0 || c + 1 >= n)
    }

    /// All `3^N - 1` unit offsets of the full-connectivity neighbourhood.
    pub fn neighbor_offsets(&self) -> Vec<Vec<isize>> {
        let n = self.ndim();
        let total = 3usize.pow(n as u32);
        let mut offsets = Vec::with_capacity(total - 1);
        for code in 0..total {
            let mut rest = code;
            let delta: Vec<isize> = (0..n)
                .map(|_| {
                    let d = (rest % 3) as isize - 1;
                    rest /= 3;
                    d
                })
                .collect();
            if delta.iter().any(|&d| d != 0) {
                offsets.push(delta);
            }
        }
        offsets
    }

    /// Flat index of `coord + delta`, or `None` when it leaves the grid.
    pub fn offset(&self, coord: &[usize], delta: &[isize]) -> Option<usize> {
        let mut index = 0;
        for axis in 0..self.ndim() {
            let c = coord[axis] as isize + delta[axis];
            if c < 0 || c >= self.shape[axis] as isize {
                return None;
            }
            index += c as usize * self.strides[axis];
        }
        Some(index)
    }
}
