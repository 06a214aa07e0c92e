//! Error types for the font subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or using fonts.
#[derive(Error, Debug)]
pub enum FontError {
    /// Neither a metrics description nor an atlas image could be found, and
    /// synthesizing them from a vector source was unavailable or failed.
    #[error("missing font assets for '{name}' (searched {searched:?})")]
    MissingAsset {
        /// The base font name that was requested.
        name: String,
        /// Every path that was probed.
        searched: Vec<PathBuf>,
    },

    /// The metrics description exists but could not be parsed or lacks a
    /// required field.
    #[error("malformed font metrics in {path:?}: {reason}")]
    MalformedSpec {
        /// Path to the offending metrics file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The atlas image could not be decoded.
    #[error("failed to decode atlas image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An I/O error occurred while reading font assets.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rasterization collaborator reported an error.
    #[error("atlas synthesis failed: {0}")]
    Synthesis(String),

    /// No loaded font matches the given name or handle.
    #[error("unknown font: {0}")]
    UnknownFont(String),

    /// The registry configuration document could not be parsed.
    #[error("invalid font configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl FontError {
    /// Whether this error means the assets are simply absent.
    pub fn is_missing_asset(&self) -> bool {
        matches!(self, FontError::MissingAsset { .. })
    }

    /// Whether this error means the metrics description is broken.
    pub fn is_malformed(&self) -> bool {
        matches!(self, FontError::MalformedSpec { .. })
    }
}

/// Result type for font operations.
pub type FontResult<T> = Result<T, FontError>;
