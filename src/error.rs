//! Custom error types for vae-image-processor.

use thiserror::Error;

/// Main error type for the vae-image-processor library.
#[derive(Error, Debug)]
pub enum Error {
    /// Input is not an image, array or tensor batch the processor can handle.
    #[error("unsupported input format: {reason}")]
    UnsupportedInputFormat { reason: String },

    /// Array or tensor input whose spatial size is not a multiple of the stride factor.
    ///
    /// Only images are resized, so other inputs must already satisfy the constraint.
    #[error(
        "{kind} input of size {height}x{width} is not divisible by {factor}; \
         only images are resized, pass an image or resize the {kind} beforehand"
    )]
    SizeNotDivisible {
        kind: &'static str,
        height: usize,
        width: usize,
        factor: u32,
    },

    /// Depth reconstruction attempted on data without a depth payload.
    #[error("cannot decode depth from {channels}-channel data")]
    UnsupportedDepthEncoding { channels: usize },

    /// Output format not supported by this processor.
    #[error("output format `{format}` is not supported")]
    UnsupportedOutputFormat { format: String },

    /// Array cannot be encoded as an image.
    #[error("cannot build an image from array of shape {shape:?}: {reason}")]
    UnsupportedShape { shape: Vec<usize>, reason: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Shape mismatch between items of one batch.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Array stacking, concatenation or reshaping failed.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type alias for vae-image-processor operations.
pub type Result<T> = std::result::Result<T, Error>;
