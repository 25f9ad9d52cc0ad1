pub mod blob_filter;
pub mod downsample;
pub mod fourier;
pub mod gaussian_blur;
pub mod median;
