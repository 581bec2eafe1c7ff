//! Error types for loading and converting images.

use std::path::PathBuf;

use inkline_pipeline::PipelineError;

/// The source image could not be obtained or is not an image.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The request never produced a response (offline, DNS, CORS
    /// rejection, aborted).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// A local file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The fetcher cannot handle this kind of reference.
    #[error("unsupported image reference: {0}")]
    UnsupportedReference(String),

    /// The response declared a non-image content type.
    #[error("not an image (content type {0})")]
    NotAnImage(String),

    /// The bytes could not be decoded as an image.
    #[error("cannot decode image: {0}")]
    Decode(String),
}

/// A URL-to-line-art conversion failed. No artifact was produced.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Fetching or decoding the source failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A raster buffer of the required size could not be allocated.
    #[error("cannot allocate raster surface: {0}")]
    Context(String),

    /// The source image has zero width or height.
    #[error("source image has degenerate dimensions {width}x{height}")]
    DegenerateInput {
        /// Source width.
        width: u32,
        /// Source height.
        height: u32,
    },

    /// A parameter is outside its supported range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The output could not be encoded.
    #[error("failed to encode output image: {0}")]
    Encode(String),
}

impl ConvertError {
    /// Stable machine-readable name of the error category.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Context(_) => "context",
            Self::DegenerateInput { .. } => "degenerate_input",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::Encode(_) => "encode",
        }
    }
}

impl From<PipelineError> for ConvertError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyInput => {
                Self::Load(LoadError::Decode("image data is empty".to_string()))
            }
            PipelineError::ImageDecode(e) => Self::Load(LoadError::Decode(e.to_string())),
            PipelineError::Context(reason) => Self::Context(reason),
            PipelineError::DegenerateInput { width, height } => {
                Self::DegenerateInput { width, height }
            }
            PipelineError::InvalidParameters(reason) => Self::InvalidParameters(reason),
            PipelineError::Encode(reason) => Self::Encode(reason),
        }
    }
}
