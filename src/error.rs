//! Error types for the classification pipeline.

use thiserror::Error;

/// Errors raised while preparing an image, running the classifier or
/// mapping its output back to labels.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("image decode")]
    Decode(#[source] image::ImageError),

    /// The upload has an extension outside the accepted set.
    #[error("unsupported file type `{name}`, expected one of: {accepted}")]
    UnsupportedUpload { name: String, accepted: String },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Resizing the image to the model input failed.
    #[error("resize")]
    Resize(#[from] fast_image_resize::ResizeError),

    /// The model produced (or was fed) a tensor with an unexpected shape.
    #[error("tensor shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// The classifier returned scores that cannot be ranked.
    #[error("model output: {message}")]
    ModelOutput { message: String },

    /// The label set does not line up with the classifier output width.
    #[error("label set has {labels} entries but the classifier emits {outputs} scores")]
    LabelMismatch { labels: usize, outputs: usize },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config { message: String },

    /// A configuration file could not be read or deserialized.
    #[error("configuration source")]
    ConfigSource(#[from] ::config::ConfigError),

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    #[error("io")]
    Io(#[from] std::io::Error),
}

impl ClassifyError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the caller supplied something unusable, as opposed to a
    /// failure inside the model or runtime.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::UnsupportedUpload { .. } | Self::InvalidInput { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClassifyError>;
