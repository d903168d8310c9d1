//! JIF Player Library
//!
//! This library drives GIF playback in a terminal: a pure playback state
//! machine, the background frame pipeline, the screen layout, and the
//! crossterm host loop that ties them together.

pub mod config;
pub mod controller;
pub mod pipeline;
pub mod terminal;
pub mod view;

pub use config::PlayerConfig;
pub use controller::{Action, Command, Message, PlaybackController, TermSize};
pub use pipeline::Pipeline;
pub use terminal::run;

/// Result type for jif-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for jif-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("frame processing failed: {0}")]
    Worker(String),
}
