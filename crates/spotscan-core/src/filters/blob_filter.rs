use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::consts::{
    IDEAL_SIGMA_FOR_DOWNSAMPLED_BLOB_DIAM, LAPLACIAN_WEIGHT_2D, LAPLACIAN_WEIGHT_3D,
};
use crate::error::{Result, SpotError};
use crate::volume::Volume;

use super::fourier::fft_convolve;
use super::gaussian_blur::make_gaussian_kernel;

/// Approximate Laplacian-of-Gaussian blob response.
///
/// Smooths with an isotropic Gaussian, then applies a discrete Laplacian
/// whose centre is positive, so blob centres become maxima. Both passes are
/// FFT convolutions; linearity makes the pair equivalent to a single LoG
/// kernel.
pub fn enhance_blobs(volume: Volume) -> Result<Volume> {
    let ndim = volume.ndim();
    debug!(shape = ?volume.shape(), "Applying Gaussian filter");
    let gauss = gaussian_kernel(IDEAL_SIGMA_FOR_DOWNSAMPLED_BLOB_DIAM, ndim);
    let smoothed = fft_convolve(volume.data(), &gauss)?;

    debug!("Applying Laplacian convolution");
    let laplacian = laplacian_kernel(ndim)?;
    let response = fft_convolve(&smoothed, &laplacian)?;

    volume.with_data(response)
}

/// Isotropic N-d Gaussian kernel, normalised to unit sum.
pub fn gaussian_kernel(sigma: f64, ndim: usize) -> ArrayD<f32> {
    let kernel_1d = make_gaussian_kernel(sigma);
    let size = kernel_1d.len();
    ArrayD::from_shape_fn(IxDyn(&vec![size; ndim]), |idx| {
        (0..ndim).map(|axis| kernel_1d[idx[axis]]).product()
    })
}

/// Discrete Laplacian with a centre weight of 1 and negative neighbours
/// summing to -1.
///
/// 2D uses all 8 neighbours at -1/8. 3D uses the 18 face and edge
/// neighbours at -1/18; corners are 0.
pub fn laplacian_kernel(ndim: usize) -> Result<ArrayD<f32>> {
    let weight = match ndim {
        2 => LAPLACIAN_WEIGHT_2D,
        3 => LAPLACIAN_WEIGHT_3D,
        _ => {
            return Err(SpotError::InvalidParameter(format!(
                "no Laplacian kernel for {ndim}D volumes"
            )))
        }
    };

    Ok(ArrayD::from_shape_fn(IxDyn(&vec![3; ndim]), |idx| {
        let off_centre = (0..ndim).filter(|&axis| idx[axis] != 1).count();
        match off_centre {
            0 => 1.0,
            n if n < 3 => weight,
            _ => 0.0,
        }
    }))
}
