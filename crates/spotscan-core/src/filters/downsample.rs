//! Anti-aliased downsampling towards a canonical blob size.
//!
//! The factor for each axis shrinks the expected blob diameter to
//! [`GOAL_DOWNSAMPLED_BLOB_DIAM`] pixels. Volumes whose blobs are already
//! smaller than that are never upsampled.

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::consts::{DOWNSAMPLE_SOURCE_SIGMA, DOWNSAMPLE_TARGET_SIGMA, GOAL_DOWNSAMPLED_BLOB_DIAM};
use crate::error::{Result, SpotError};
use crate::volume::Volume;

use super::gaussian_blur::gaussian_blur_volume;

/// Per-axis downsample factors for a blob of `diameter` physical units.
///
/// Returns one factor per axis of an `ndim`-dimensional volume. Every factor
/// is at least 1; the depth axis only exists (and is only scaled) for 3D.
pub fn downsample_factors(diameter: f64, calibration: &[f64], ndim: usize) -> Result<Vec<f64>> {
    if !(2..=3).contains(&ndim) {
        return Err(SpotError::InvalidParameter(format!(
            "only 2D and 3D volumes are supported, got {ndim}D"
        )));
    }
    if !diameter.is_finite() || diameter <= 0.0 {
        return Err(SpotError::InvalidParameter(format!(
            "blob diameter must be positive, got {diameter}"
        )));
    }
    if calibration.len() < ndim {
        return Err(SpotError::InvalidParameter(format!(
            "calibration has {} entries for a {}D volume",
            calibration.len(),
            ndim
        )));
    }

    calibration[..ndim]
        .iter()
        .map(|&cal| {
            if !cal.is_finite() || cal <= 0.0 {
                return Err(SpotError::InvalidParameter(format!(
                    "calibration must be positive, got {cal}"
                )));
            }
            let diameter_px = diameter / cal;
            Ok(if diameter_px > GOAL_DOWNSAMPLED_BLOB_DIAM {
                diameter_px / GOAL_DOWNSAMPLED_BLOB_DIAM
            } else {
                1.0
            })
        })
        .collect()
}

/// Target shape `floor(size / factor)` per axis.
pub fn downsampled_shape(shape: &[usize], factors: &[f64]) -> Result<Vec<usize>> {
    if factors.len() != shape.len() {
        return Err(SpotError::Precondition {
            stage: "downsample",
            reason: format!("{} factors for a {}D volume", factors.len(), shape.len()),
        });
    }
    let target: Vec<usize> = shape
        .iter()
        .zip(factors)
        .map(|(&n, &f)| (n as f64 / f).floor() as usize)
        .collect();
    if target.iter().any(|&n| n == 0) {
        return Err(SpotError::InvalidDimensions(target));
    }
    Ok(target)
}

/// Low-pass filter then decimate `volume` by `factors`.
///
/// Each axis is blurred with `sigma = sqrt((t * s)^2 - src^2)` where `s` is the
/// actual size ratio, `t` the target sigma and `src` the assumed source
/// sigma, then sampled at `floor(i * s)`.
pub fn downsample(volume: &Volume, factors: &[f64]) -> Result<Volume> {
    let shape = volume.shape().to_vec();
    let target = downsampled_shape(&shape, factors)?;
    if target == shape {
        return Ok(volume.clone());
    }

    let scales: Vec<f64> = shape
        .iter()
        .zip(&target)
        .map(|(&old, &new)| old as f64 / new as f64)
        .collect();
    let sigmas: Vec<f64> = scales
        .iter()
        .map(|&s| {
            let t = DOWNSAMPLE_TARGET_SIGMA * s;
            (t * t - DOWNSAMPLE_SOURCE_SIGMA * DOWNSAMPLE_SOURCE_SIGMA)
                .max(0.0)
                .sqrt()
        })
        .collect();
    debug!(?shape, ?target, ?sigmas, "Downsampling volume");

    let blurred = gaussian_blur_volume(volume.data(), &sigmas);
    let data = ArrayD::from_shape_fn(IxDyn(&target), |idx| {
        let mut src = IxDyn(&shape);
        for axis in 0..shape.len() {
            src[axis] = ((idx[axis] as f64 * scales[axis]).floor() as usize).min(shape[axis] - 1);
        }
        blurred[src]
    });

    let calibration: Vec<f64> = volume
        .calibration()
        .iter()
        .zip(&scales)
        .map(|(c, s)| c * s)
        .collect();
    Volume::new(data, &calibration)
}
