//! JIF Core Library
//!
//! This library provides the decoded GIF frame model and the loaders that
//! turn a file path or URL into a [`FrameSource`].

pub mod frame;
pub mod source;

pub use frame::{Bounds, Disposal, SubFrame};
pub use source::{is_url, FrameSource};

/// Result type for jif-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for jif-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open file {path}: {source}")]
    Open {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to download {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP error fetching {url}: {status} {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("failed to decode GIF: {0}")]
    Decode(#[from] gif::DecodingError),

    #[error("GIF contains no frames")]
    NoFrames,
}
