use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid volume dimensions: {0:?}")]
    InvalidDimensions(Vec<usize>),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Precondition failed in {stage}: {reason}")]
    Precondition { stage: &'static str, reason: String },

    #[error("Incompatible shapes: volume {volume:?} vs kernel {kernel:?}")]
    IncompatibleShapes {
        volume: Vec<usize>,
        kernel: Vec<usize>,
    },

    #[error("Numerical failure in {0}")]
    NumericalFailure(&'static str),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, SpotError>;
