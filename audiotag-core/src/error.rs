//! Error types for the playback controller.
//!
//! Failures fall into three groups with different delivery paths:
//! acquisition failures become `error` events on the bus, validation
//! failures become log warnings while the previous value is retained, and
//! configuration failures are reported to the caller directly.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    // ------------------------------------------------------------------
    // Acquisition errors
    // ------------------------------------------------------------------
    /// The transport failed while opening or reading the source.
    #[error("Failed to fetch '{url}': {message}")]
    TransportFailed { url: String, message: String },

    /// The decoder rejected the fetched payload.
    #[error("Failed to decode audio data: {0}")]
    DecodeFailed(String),

    // ------------------------------------------------------------------
    // Validation errors
    // ------------------------------------------------------------------
    /// Volume outside `[0.0, 1.0]` or not a number.
    #[error("Volume must be a number between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    /// Playback position that is negative or not finite.
    #[error("Playback position must be a finite non-negative number, got {0}")]
    InvalidPosition(f64),

    // ------------------------------------------------------------------
    // Configuration errors
    // ------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TagError {
    pub fn transport(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::TransportFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::DecodeFailed(message.to_string())
    }

    /// True for failures that surface as `error` events on the bus.
    pub fn is_acquisition_error(&self) -> bool {
        matches!(self, Self::TransportFailed { .. } | Self::DecodeFailed(_))
    }

    /// True for failures that only warn and leave state untouched.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidVolume(_) | Self::InvalidPosition(_))
    }
}

pub type Result<T> = std::result::Result<T, TagError>;
