//! # Audiotag Core
//!
//! A playback controller for streamed, fully-decoded audio sources,
//! shaped like an HTML media element: one "now playing" slot driven
//! through load, start, pause, resume, seek, and completion, with events
//! reporting every transition.
//!
//! The controller is host-agnostic. It consumes three capabilities from
//! `audiotag-traits`: a [`MediaTransport`](audiotag_traits::MediaTransport)
//! that streams bytes, an [`AudioDecoder`](audiotag_traits::AudioDecoder)
//! that turns them into PCM, and an [`AudioGraph`](audiotag_traits::AudioGraph)
//! that owns the output clock and gain. `audiotag-desktop` provides HTTP
//! and Symphonia implementations for the first two.
//!
//! ## Behavior highlights
//!
//! - Every [`AudioTag::play`] supersedes the previous one: an in-flight
//!   fetch is aborted, an in-flight decode finishes but its buffer is
//!   discarded, and a playing node is detached before it is stopped.
//!   Superseded work resolves silently; only real failures emit `error`
//!   events.
//! - Replaying the same source reuses the decoded buffer instead of
//!   fetching again, and resuming after a pause reuses the node itself.
//! - Position arithmetic leans on the graph clock being frozen while
//!   suspended, so a paused position holds still without bookkeeping.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use audiotag_core::{AudioTag, EventKind, TagConfig};
//! use audiotag_desktop::{HttpTransport, SymphoniaDecoder};
//!
//! let tag = AudioTag::new(
//!     Arc::new(MyGraph::new()?),
//!     Arc::new(SymphoniaDecoder::new()),
//!     Arc::new(HttpTransport::new()?),
//!     TagConfig::new().with_src("https://example.com/track.ogg"),
//! );
//! tag.on(EventKind::Ended, |_| println!("done"));
//! tag.play(None).await;
//! ```

pub mod acquire;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;

pub use acquire::AcquisitionPipeline;
pub use cancel::{CancelKind, CancelSlot};
pub use config::TagConfig;
pub use controller::{AudioTag, PlaybackPhase};
pub use error::{Result, TagError};
pub use events::{EventBus, EventKind, HandlerId, PlayState, TagEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
