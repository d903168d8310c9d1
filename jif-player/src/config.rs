//! Player configuration

use std::time::Duration;

/// Delay used for frames that specify 0, in hundredths of a second
pub const DEFAULT_FRAME_DELAY: u16 = 10;

/// Player configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Start with playback paused on the first frame
    pub start_paused: bool,
    /// Show the keybinding panel when playback starts
    pub show_help: bool,
    /// Lower bound for the time a frame stays on screen
    pub min_frame_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_paused: false,
            show_help: false,
            min_frame_delay: Duration::from_millis(10),
        }
    }
}

impl PlayerConfig {
    /// How long a frame with the given GIF delay stays on screen
    pub fn frame_duration(&self, delay: u16) -> Duration {
        let delay = if delay == 0 { DEFAULT_FRAME_DELAY } else { delay };
        Duration::from_millis(delay as u64 * 10).max(self.min_frame_delay)
    }
}
