//! Event hub for playback notifications.
//!
//! The hub carries two delivery styles side by side:
//!
//! - **Callback handlers** registered per event kind with [`EventBus::on`].
//!   Handlers run synchronously inside [`EventBus::emit`], in registration
//!   order, and a panicking handler never prevents later handlers from
//!   running.
//! - **Broadcast subscribers** obtained from [`EventBus::subscribe`], for
//!   async consumers that want every event on a channel.
//!
//! Each controller instance owns its own bus; there is no process-global
//! registry.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::error;

/// Default buffer size for broadcast subscribers.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ----------------------------------------------------------------------
// Event types
// ----------------------------------------------------------------------

/// Coarse play/pause state reported on `playStateChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// The kinds of event the controller emits. Used as the registration key
/// for callback handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Progress,
    Loaded,
    Error,
    PlayStateChange,
    TimeUpdate,
    Ended,
    VolumeChange,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Progress => "progress",
            Self::Loaded => "loaded",
            Self::Error => "error",
            Self::PlayStateChange => "playStateChange",
            Self::TimeUpdate => "timeUpdate",
            Self::Ended => "ended",
            Self::VolumeChange => "volumeChange",
        };
        write!(f, "{name}")
    }
}

/// Events emitted during fetch, decode, and playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TagEvent {
    /// Transfer progress for the source currently being fetched.
    Progress {
        src: String,
        /// Percent of the payload received, `0.0` when the total size is
        /// unknown.
        percentage: f32,
        /// Bytes received so far.
        chunked: u64,
    },
    /// The fetched payload decoded successfully.
    Loaded,
    /// Acquisition failed; `message` is stable, `error` carries detail.
    Error { message: String, error: String },
    /// Playback started or stopped.
    PlayStateChange { state: PlayState },
    /// Periodic position report while playing.
    TimeUpdate { current_time: f64 },
    /// The current source played to its natural end.
    Ended,
    /// The volume property changed through a valid assignment.
    VolumeChange { volume: f32 },
}

impl TagEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Progress { .. } => EventKind::Progress,
            Self::Loaded => EventKind::Loaded,
            Self::Error { .. } => EventKind::Error,
            Self::PlayStateChange { .. } => EventKind::PlayStateChange,
            Self::TimeUpdate { .. } => EventKind::TimeUpdate,
            Self::Ended => EventKind::Ended,
            Self::VolumeChange { .. } => EventKind::VolumeChange,
        }
    }

    /// Short human-readable description for diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "transfer progress",
            Self::Loaded => "payload decoded",
            Self::Error { .. } => "acquisition failed",
            Self::PlayStateChange { .. } => "play state changed",
            Self::TimeUpdate { .. } => "position update",
            Self::Ended => "playback ended",
            Self::VolumeChange { .. } => "volume changed",
        }
    }
}

// ----------------------------------------------------------------------
// Event bus
// ----------------------------------------------------------------------

/// Identifies one registered callback handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&TagEvent) + Send + Sync + 'static>;

struct HandlerTable {
    next_id: u64,
    entries: HashMap<EventKind, Vec<(HandlerId, Handler)>>,
}

struct BusInner {
    handlers: Mutex<HandlerTable>,
    broadcast: broadcast::Sender<TagEvent>,
}

/// Per-instance event hub. Cheap to clone; clones share the same handler
/// table and broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus whose broadcast side buffers up to `capacity` events
    /// per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                handlers: Mutex::new(HandlerTable {
                    next_id: 0,
                    entries: HashMap::new(),
                }),
                broadcast: sender,
            }),
        }
    }

    /// Register a callback for one event kind. Handlers for the same kind
    /// run in registration order.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&TagEvent) + Send + Sync + 'static,
    {
        let mut table = self.inner.handlers.lock();
        table.next_id += 1;
        let id = HandlerId(table.next_id);
        table
            .entries
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove the first handler registered under `kind` with this id.
    /// Returns `false` when no such handler exists.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut table = self.inner.handlers.lock();
        let Some(list) = table.entries.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|(hid, _)| *hid == id) else {
            return false;
        };
        list.remove(pos);
        true
    }

    /// Deliver `event` to every callback registered for its kind, then to
    /// all broadcast subscribers.
    ///
    /// A panic inside one handler is caught and logged; remaining handlers
    /// still run.
    pub fn emit(&self, event: TagEvent) {
        let handlers: Vec<Handler> = {
            let table = self.inner.handlers.lock();
            table
                .entries
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(kind = %event.kind(), "event handler panicked");
            }
        }

        // No subscribers is not an error.
        let _ = self.inner.broadcast.send(event);
    }

    /// Subscribe to the broadcast side of the bus. The receiver sees every
    /// event emitted after this call, regardless of kind.
    pub fn subscribe(&self) -> broadcast::Receiver<TagEvent> {
        self.inner.broadcast.subscribe()
    }

    /// Number of callback handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner
            .handlers
            .lock()
            .entries
            .get(&kind)
            .map_or(0, Vec::len)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
