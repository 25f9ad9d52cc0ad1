use std::fs::File;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SpotError};
use crate::frame::Stack;

/// Sample encoding of a headerless stack file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    U8,
    #[default]
    U16,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit unsigned"),
            Self::U16 => write!(f, "16-bit unsigned"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

/// Geometry and encoding of a raw stack file.
///
/// Slices are stored back to back after `header_bytes`, frame-major: all
/// z-planes of frame 0, then frame 1, and so on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawLayout {
    pub width: usize,
    pub height: usize,
    #[serde(default = "one")]
    pub num_slices: usize,
    #[serde(default = "one")]
    pub num_frames: usize,
    #[serde(default)]
    pub format: SampleFormat,
    #[serde(default = "default_little_endian")]
    pub little_endian: bool,
    #[serde(default)]
    pub header_bytes: usize,
}

fn one() -> usize {
    1
}

fn default_little_endian() -> bool {
    true
}

impl RawLayout {
    pub fn slice_byte_size(&self) -> Result<usize> {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.format.bytes_per_sample()))
            .ok_or_else(|| SpotError::InvalidDimensions(vec![self.width, self.height]))
    }

    pub fn slice_count(&self) -> usize {
        self.num_slices * self.num_frames
    }
}

/// Memory-mapped reader for headerless sample stacks.
pub struct RawReader {
    mmap: Mmap,
    pub layout: RawLayout,
}

impl RawReader {
    /// Map `path` and check that it holds every slice of `layout`.
    pub fn open(path: &Path, layout: RawLayout) -> Result<Self> {
        if layout.width == 0 || layout.height == 0 || layout.num_slices == 0 || layout.num_frames == 0
        {
            return Err(SpotError::InvalidDimensions(vec![
                layout.width,
                layout.height,
                layout.num_slices,
                layout.num_frames,
            ]));
        }
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let expected = layout
            .slice_byte_size()?
            .checked_mul(layout.slice_count())
            .and_then(|n| n.checked_add(layout.header_bytes))
            .ok_or_else(|| SpotError::InvalidInput("stack size overflows".into()))?;
        if mmap.len() < expected {
            return Err(SpotError::InvalidInput(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected,
                mmap.len()
            )));
        }
        debug!(
            path = %path.display(),
            bytes = mmap.len(),
            format = %layout.format,
            "Mapped raw stack"
        );

        Ok(Self { mmap, layout })
    }

    /// Raw bytes of slice `index` (zero-copy from the mapping).
    pub fn slice_raw(&self, index: usize) -> Result<&[u8]> {
        let total = self.layout.slice_count();
        if index >= total {
            return Err(SpotError::FrameIndexOutOfRange { index, total });
        }
        let size = self.layout.slice_byte_size()?;
        let offset = self.layout.header_bytes + index * size;
        Ok(&self.mmap[offset..offset + size])
    }

    /// Decode slice `index` to `f32` samples, row-major.
    pub fn read_slice(&self, index: usize) -> Result<Vec<f32>> {
        let raw = self.slice_raw(index)?;
        Ok(if self.layout.little_endian {
            decode_samples::<LittleEndian>(raw, self.layout.format)
        } else {
            decode_samples::<BigEndian>(raw, self.layout.format)
        })
    }

    /// Decode the whole file into a [`Stack`]. Intensities keep their raw
    /// scale.
    pub fn read_stack(&self, calibration: [f64; 3]) -> Result<Stack> {
        let layout = &self.layout;
        let mut samples = Vec::with_capacity(layout.width * layout.height * layout.slice_count());
        for index in 0..layout.slice_count() {
            samples.extend(self.read_slice(index)?);
        }
        Stack::new(
            samples,
            layout.width,
            layout.height,
            layout.num_slices,
            layout.num_frames,
            calibration,
        )
    }
}

/// Open and decode a raw stack file in one step.
pub fn load_raw_stack(path: &Path, layout: RawLayout, calibration: [f64; 3]) -> Result<Stack> {
    RawReader::open(path, layout)?.read_stack(calibration)
}

fn decode_samples<B: ByteOrder>(raw: &[u8], format: SampleFormat) -> Vec<f32> {
    match format {
        SampleFormat::U8 => raw.iter().map(|&v| v as f32).collect(),
        SampleFormat::U16 => {
            let mut values = vec![0u16; raw.len() / 2];
            B::read_u16_into(raw, &mut values);
            values.into_iter().map(|v| v as f32).collect()
        }
        SampleFormat::F32 => {
            let mut values = vec![0f32; raw.len() / 4];
            B::read_f32_into(raw, &mut values);
            values
        }
    }
}
