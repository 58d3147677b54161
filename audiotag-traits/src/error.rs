//! Error types shared by all host capability implementations.

use thiserror::Error;

/// Errors surfaced by host-side implementations of the capability traits.
#[derive(Error, Debug)]
pub enum HostError {
    /// The capability is not available on this platform.
    #[error("Capability not available: {0}")]
    NotAvailable(String),

    /// A platform operation failed in a way that has no dedicated variant.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// The transport could not open or read the requested source.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload could not be decoded into PCM audio.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for host capability results.
pub type Result<T> = std::result::Result<T, HostError>;
