//! Output graph contract: clock, gain stage, and source nodes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;

/// A fully decoded, interleaved PCM buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<f32>,
    /// Channel count, at least 1.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames in the buffer.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Buffer length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Control surface for one started source node.
///
/// Both calls must be idempotent; the controller may stop a node that has
/// already finished on its own.
pub trait SourceHandle: Send + Sync {
    /// Stop playback at graph time `when` (seconds). `0.0` means now.
    fn stop(&self, when: f64);

    /// Detach the node from the graph so it can be dropped by the host.
    fn disconnect(&self);
}

/// A started source node together with its completion signal.
///
/// The completion receiver resolves exactly once when the source plays to
/// its natural end. If the node is stopped or disconnected first, the
/// sender side is dropped and the receiver resolves with an error instead;
/// callers use that distinction to ignore interrupted sources.
pub struct ActiveSource {
    pub handle: Box<dyn SourceHandle>,
    pub completion: oneshot::Receiver<()>,
}

impl std::fmt::Debug for ActiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSource").finish_non_exhaustive()
    }
}

/// The host audio output: a master gain stage feeding a device, plus a
/// monotonic clock that the controller uses for position arithmetic.
///
/// # Contract
///
/// - Implementations start in the suspended state. Nothing is audible and
///   the clock does not advance until [`resume`](AudioGraph::resume).
/// - [`now`](AudioGraph::now) is frozen while suspended, so a position
///   computed as `now - start_time` holds still across a pause.
/// - [`set_gain`](AudioGraph::set_gain) applies immediately to all current
///   and future sources.
/// - [`start_source`](AudioGraph::start_source) begins playback of `buffer`
///   at graph time `when`, skipping the first `offset` seconds of content.
#[async_trait]
pub trait AudioGraph: Send + Sync {
    /// Freeze the clock and silence output. Idempotent.
    async fn suspend(&self) -> Result<()>;

    /// Unfreeze the clock and let sources run. Idempotent.
    async fn resume(&self) -> Result<()>;

    fn is_suspended(&self) -> bool;

    /// Current graph time in seconds.
    fn now(&self) -> f64;

    /// Master gain, expected in `[0.0, 1.0]`.
    fn set_gain(&self, gain: f32);

    /// Create and start a source node for `buffer`.
    fn start_source(
        &self,
        buffer: Arc<AudioBuffer>,
        when: f64,
        offset: f64,
    ) -> Result<ActiveSource>;
}
