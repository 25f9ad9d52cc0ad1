use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use tracing::debug;

use crate::detection::Spot;
use crate::error::{Result, SpotError};
use crate::frame::Stack;
use crate::volume::Volume;

/// Half-length of the cross drawn over each marked spot, in pixels.
const MARKER_ARM: i64 = 2;

/// Load one grayscale image as row-major `f32` samples on the 16-bit scale.
///
/// Returns `(width, height, samples)`.
pub fn load_slice(path: &Path) -> Result<(usize, usize, Vec<f32>)> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let samples = gray.into_raw().into_iter().map(|v| v as f32).collect();
    Ok((w as usize, h as usize, samples))
}

/// Load an ordered list of slice images into a stack.
///
/// Files are taken frame-major: the first `num_slices` paths are the
/// z-planes of frame 0, and so on. Every image must share the first one's
/// size.
pub fn load_slice_stack(paths: &[PathBuf], num_slices: usize, calibration: [f64; 3]) -> Result<Stack> {
    if paths.is_empty() {
        return Err(SpotError::EmptySequence);
    }
    if num_slices == 0 || paths.len() % num_slices != 0 {
        return Err(SpotError::InvalidParameter(format!(
            "{} images cannot be split into frames of {} slices",
            paths.len(),
            num_slices
        )));
    }

    let (width, height, mut samples) = load_slice(&paths[0])?;
    samples.reserve(width * height * (paths.len() - 1));
    for path in &paths[1..] {
        let (w, h, slice) = load_slice(path)?;
        if (w, h) != (width, height) {
            return Err(SpotError::InvalidInput(format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                w,
                h,
                width,
                height
            )));
        }
        samples.extend(slice);
    }
    debug!(images = paths.len(), width, height, "Loaded slice images");

    Stack::new(
        samples,
        width,
        height,
        num_slices,
        paths.len() / num_slices,
        calibration,
    )
}

/// Save the maximum-intensity projection of `volume` along z as an 8-bit
/// PNG, with a red cross over each spot.
pub fn save_projection_png(volume: &Volume, spots: &[&Spot], path: &Path) -> Result<()> {
    let shape = volume.shape();
    let (w, h) = (shape[0], shape[1]);
    let data = volume.data();

    let mut projection = vec![f32::NEG_INFINITY; w * h];
    for (idx, &v) in data.indexed_iter() {
        let slot = &mut projection[idx[1] * w + idx[0]];
        *slot = slot.max(v);
    }
    let (lo, hi) = projection
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = (hi - lo).max(f32::EPSILON);

    let mut img = RgbImage::new(w as u32, h as u32);
    for (i, &v) in projection.iter().enumerate() {
        let level = (((v - lo) / range).clamp(0.0, 1.0) * 255.0) as u8;
        img.put_pixel((i % w) as u32, (i / w) as u32, Rgb([level, level, level]));
    }

    for spot in spots {
        let cx = spot.coordinates.first().copied().unwrap_or(0.0).round() as i64;
        let cy = spot.coordinates.get(1).copied().unwrap_or(0.0).round() as i64;
        for d in -MARKER_ARM..=MARKER_ARM {
            for (x, y) in [(cx + d, cy), (cx, cy + d)] {
                if (0..w as i64).contains(&x) && (0..h as i64).contains(&y) {
                    img.put_pixel(x as u32, y as u32, Rgb([255, 0, 0]));
                }
            }
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
