// THEORY:
// Every failure the vision core can produce is a value of `VisionError`. Nothing in
// the library panics or prints; the caller decides whether a bad frame skips the
// frame or aborts the run. Two routine outcomes are deliberately *not* errors:
// a blob that fails the admission test is simply not reported, and a frame source
// that has run dry answers `Ok(None)`.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    /// A buffer was requested with a zero width, height, channel count or level
    /// ceiling, or with a stride narrower than one row of pixels.
    #[error("invalid bitmap dimensions {width}x{height}, {channels} channel(s), {levels} level(s), stride {stride}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
        levels: u16,
        stride: usize,
    },

    #[error("could not allocate {bytes} bytes of pixel storage")]
    AllocationFailure { bytes: usize },

    /// Source and destination buffers (or a raw payload) disagree with what the
    /// operation needs.
    #[error("{operation}: shape mismatch ({detail})")]
    ShapeMismatch {
        operation: &'static str,
        detail: String,
    },

    #[error("{operation}: kernel size {size} is not usable")]
    InvalidKernel { operation: &'static str, size: usize },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed NetPBM header: {0}")]
    MalformedHeader(&'static str),

    #[error("truncated pixel data: expected {expected} bytes, found {actual}")]
    TruncatedData { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl VisionError {
    pub(crate) fn shape(operation: &'static str, detail: impl Into<String>) -> Self {
        VisionError::ShapeMismatch {
            operation,
            detail: detail.into(),
        }
    }
}
