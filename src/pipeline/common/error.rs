use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Scanline range [{0}, {1}] is outside the buffer (height {2})")]
    RangeOutOfBounds(usize, usize, usize),

    #[error("Output buffer holds {actual} samples, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Unsupported mosaic pattern: {0:?}")]
    UnsupportedPattern(String),

    #[error("Stage expects {expected}-channel input, upstream produces {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Scanline {0} was computed without a prior demand declaration")]
    UndeclaredRow(usize),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
