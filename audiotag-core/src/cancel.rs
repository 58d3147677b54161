//! Tagged cancellation for in-flight acquisitions.
//!
//! At most one acquisition is cancellable at a time. The live handle is
//! tagged with the phase it would interrupt: cancelling during transfer
//! aborts the stream outright, cancelling during decode lets the decode
//! finish and discards its result. Handles carry an id so that a finished
//! acquisition can only clear itself, never a successor that has since
//! taken the slot.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What cancelling the live handle interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// Transfer in progress; cancellation aborts the stream.
    Abort,
    /// Decode in progress; cancellation discards the decoded buffer.
    Discard,
}

impl std::fmt::Display for CancelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

struct LiveHandle {
    id: u64,
    kind: CancelKind,
    token: CancellationToken,
}

struct SlotInner {
    next_id: u64,
    live: Option<LiveHandle>,
}

/// Holder for the single live cancellation handle.
pub struct CancelSlot {
    inner: Mutex<SlotInner>,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                next_id: 0,
                live: None,
            }),
        }
    }

    /// Install an abort-phase handle for a new acquisition and return its
    /// id. Any previous handle is dropped without being invoked; callers
    /// that want the old acquisition stopped use [`take_and_cancel`]
    /// first.
    ///
    /// [`take_and_cancel`]: CancelSlot::take_and_cancel
    pub fn begin(&self, token: &CancellationToken) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        if let Some(old) = inner.live.replace(LiveHandle {
            id,
            kind: CancelKind::Abort,
            token: token.clone(),
        }) {
            debug!(superseded = old.id, "replaced a live cancellation handle");
        }
        id
    }

    /// Move the handle for acquisition `id` into the discard phase.
    /// Returns `false` when a newer acquisition owns the slot.
    pub fn advance(&self, id: u64, token: &CancellationToken) -> bool {
        let mut inner = self.inner.lock();
        match &mut inner.live {
            Some(live) if live.id == id => {
                live.kind = CancelKind::Discard;
                live.token = token.clone();
                true
            }
            _ => false,
        }
    }

    /// Clear the handle for acquisition `id`. A no-op when a newer
    /// acquisition owns the slot, so a slow finisher cannot strip its
    /// successor's handle.
    pub fn finish(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        match &inner.live {
            Some(live) if live.id == id => {
                inner.live = None;
                true
            }
            _ => false,
        }
    }

    /// Invoke and clear the live handle, returning the phase it
    /// interrupted, or `None` when nothing was in flight.
    pub fn take_and_cancel(&self) -> Option<CancelKind> {
        let live = self.inner.lock().live.take()?;
        live.token.cancel();
        Some(live.kind)
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().live.is_some()
    }

    /// Phase of the live handle, if any.
    pub fn active_kind(&self) -> Option<CancelKind> {
        self.inner.lock().live.as_ref().map(|live| live.kind)
    }
}

impl Default for CancelSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSlot")
            .field("active_kind", &self.active_kind())
            .finish()
    }
}
