//! Error types for atlas synthesis.

use std::path::PathBuf;

use bitfont::FontError;
use thiserror::Error;

/// Errors that can occur while rasterizing a vector font.
#[derive(Error, Debug)]
pub enum SynthError {
    /// The source file does not exist.
    #[error("no vector font at {0:?}")]
    NoVectorSource(PathBuf),

    /// The file was read but holds no usable font face.
    #[error("no parsable font face in {0:?}")]
    FaceParse(PathBuf),

    /// Writing the atlas image failed.
    #[error("failed to write atlas image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the metrics description failed.
    #[error("failed to encode metrics description: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SynthError> for FontError {
    fn from(err: SynthError) -> Self {
        FontError::Synthesis(err.to_string())
    }
}

/// Result type for synthesis.
pub type SynthResult<T> = Result<T, SynthError>;
