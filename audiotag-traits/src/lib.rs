//! # Audiotag Host Traits
//!
//! Capability contracts between the playback controller and the host
//! platform. The controller in `audiotag-core` is written entirely against
//! these traits; a host crate (such as `audiotag-desktop`) supplies the
//! concrete transport, decoder, and output graph.
//!
//! ## Traits
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`MediaTransport`] | Open a byte stream for a source URL |
//! | [`AudioDecoder`] | Decode a complete encoded payload into PCM |
//! | [`AudioGraph`] | Own the output clock, gain stage, and source nodes |
//!
//! ## Error Handling
//!
//! All fallible operations return [`HostError`]. Implementations should map
//! platform failures into the closest variant rather than panicking; the
//! controller turns these into user-visible error events.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`. Implementations are shared behind
//! `Arc` and may be called concurrently from spawned tasks.

pub mod decoder;
pub mod error;
pub mod graph;
pub mod transport;

pub use decoder::AudioDecoder;
pub use error::{HostError, Result};
pub use graph::{ActiveSource, AudioBuffer, AudioGraph, SourceHandle};
pub use transport::{MediaStream, MediaTransport};
