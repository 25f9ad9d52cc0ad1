pub mod image_io;
pub mod raw;

pub use image_io::{load_slice, load_slice_stack, save_projection_png};
pub use raw::{load_raw_stack, RawLayout, RawReader, SampleFormat};
