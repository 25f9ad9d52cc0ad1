use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use spotscan_core::frame::Stack;
use spotscan_core::io::{load_raw_stack, load_slice_stack, RawLayout, SampleFormat};

#[derive(Clone, Copy, ValueEnum)]
pub enum SampleFormatArg {
    U8,
    U16,
    F32,
}

impl From<SampleFormatArg> for SampleFormat {
    fn from(arg: SampleFormatArg) -> Self {
        match arg {
            SampleFormatArg::U8 => SampleFormat::U8,
            SampleFormatArg::U16 => SampleFormat::U16,
            SampleFormatArg::F32 => SampleFormat::F32,
        }
    }
}

/// Where the stack comes from: an ordered list of slice images, or one
/// headerless raw file when `--width` is given.
#[derive(Args)]
pub struct InputArgs {
    /// Slice images in acquisition order, or a single raw stack file
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Z-planes per frame
    #[arg(long, default_value = "1")]
    pub slices: usize,

    /// Physical voxel size as x,y,z
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0])]
    pub calibration: Vec<f64>,

    /// Raw file: slice width in pixels
    #[arg(long, requires = "height")]
    pub width: Option<usize>,

    /// Raw file: slice height in pixels
    #[arg(long, requires = "width")]
    pub height: Option<usize>,

    /// Raw file: number of frames
    #[arg(long, default_value = "1")]
    pub frames: usize,

    /// Raw file: sample encoding
    #[arg(long, value_enum, default_value = "u16")]
    pub format: SampleFormatArg,

    /// Raw file: samples are big-endian
    #[arg(long)]
    pub big_endian: bool,

    /// Raw file: bytes to skip before the first slice
    #[arg(long, default_value = "0")]
    pub header_bytes: usize,
}

impl InputArgs {
    pub fn calibration(&self) -> Result<[f64; 3]> {
        match self.calibration.as_slice() {
            &[x, y, z] => Ok([x, y, z]),
            other => bail!("--calibration needs 3 values, got {}", other.len()),
        }
    }

    pub fn is_raw(&self) -> bool {
        self.width.is_some()
    }

    pub fn load(&self) -> Result<Stack> {
        let calibration = self.calibration()?;
        match (self.width, self.height) {
            (Some(width), Some(height)) => {
                let [path] = self.files.as_slice() else {
                    bail!("raw input takes exactly one file, got {}", self.files.len());
                };
                let layout = RawLayout {
                    width,
                    height,
                    num_slices: self.slices,
                    num_frames: self.frames,
                    format: self.format.into(),
                    little_endian: !self.big_endian,
                    header_bytes: self.header_bytes,
                };
                load_raw_stack(path, layout, calibration)
                    .with_context(|| format!("Failed to read raw stack {}", path.display()))
            }
            _ => load_slice_stack(&self.files, self.slices, calibration)
                .context("Failed to read slice images"),
        }
    }
}
