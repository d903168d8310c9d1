//! JIF Render Library
//!
//! This library reconstructs full animation frames from GIF sub-frames and
//! rasterizes them into half-block terminal text.

pub mod frame_compositor;
pub mod halfblock;

pub use frame_compositor::{canvas_bounds, composite, FrameCompositor};
pub use halfblock::{calculate_image_size, rasterize, rasterize_with_progress, Progress};
