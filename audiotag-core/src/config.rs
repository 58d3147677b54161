//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Initial property values and tuning knobs for an [`AudioTag`].
///
/// [`AudioTag`]: crate::controller::AudioTag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Source URL to load. May be empty; playback starts on the first
    /// explicit `play` or source assignment.
    #[serde(default)]
    pub src: String,

    /// Initial volume in `[0.0, 1.0]`.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Replay from the start when the source ends.
    #[serde(default)]
    pub looping: bool,

    /// Start with the gain stage silenced. The stored volume is kept.
    #[serde(default)]
    pub muted: bool,

    /// Interval between `timeUpdate` events while playing.
    #[serde(default = "default_time_update_interval")]
    pub time_update_interval: Duration,

    /// Broadcast buffer size per event subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl TagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = src.into();
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_time_update_interval(mut self, interval: Duration) -> Self {
        self.time_update_interval = interval;
        self
    }

    /// Check the configuration for values the controller would otherwise
    /// have to clamp or replace.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            ));
        }
        if self.time_update_interval.is_zero() {
            return Err("time_update_interval must be greater than zero".to_string());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            src: String::new(),
            volume: default_volume(),
            looping: false,
            muted: false,
            time_update_interval: default_time_update_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

// ----------------------------------------------------------------------
// Serde default functions
// ----------------------------------------------------------------------

fn default_volume() -> f32 {
    1.0
}

fn default_time_update_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}
