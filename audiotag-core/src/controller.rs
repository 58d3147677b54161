//! Playback orchestrator.
//!
//! [`AudioTag`] drives a single "now playing" slot through load, start,
//! pause, resume, seek, and completion. Each call to [`AudioTag::play`]
//! supersedes whatever the controller was doing before: an in-flight
//! acquisition is cancelled through the shared [`CancelSlot`] and a
//! playing source node is detached and stopped before the new one starts.
//!
//! All mutable state lives behind one synchronous mutex that is never
//! held across an await point; the graph, pipeline, and event bus are
//! shared handles that spawned tasks reach through a weak reference so a
//! dropped controller shuts its tasks down.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use audiotag_traits::{AudioBuffer, AudioDecoder, AudioGraph, MediaTransport, SourceHandle};

use crate::acquire::AcquisitionPipeline;
use crate::cancel::CancelSlot;
use crate::config::TagConfig;
use crate::error::TagError;
use crate::events::{EventBus, EventKind, HandlerId, PlayState, TagEvent};

/// Where the controller currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No source loaded and nothing in flight.
    Idle,
    /// An acquisition is in flight.
    Loading,
    Playing,
    Paused,
    /// The current source played to its natural end.
    Ended,
}

impl PlaybackPhase {
    /// True while the controller holds or is building a usable source.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// The "now playing" slot: which source is installed and whether it ran
/// to completion.
struct Slot {
    url: String,
    buffer: Option<Arc<AudioBuffer>>,
    node: Option<Box<dyn SourceHandle>>,
    ended: bool,
}

impl Slot {
    fn empty() -> Self {
        Self {
            url: String::new(),
            buffer: None,
            node: None,
            ended: true,
        }
    }
}

struct TagState {
    src: String,
    volume: f32,
    muted: bool,
    looping: bool,
    /// Graph time at which the current node started, minus its offset.
    /// `None` whenever no node is running.
    start_time: Option<f64>,
    /// Bumped on every install and teardown; completion callbacks carry
    /// the generation they were installed under and stale ones are
    /// ignored.
    generation: u64,
    slot: Slot,
    ticker: Option<JoinHandle<()>>,
}

struct TagInner {
    graph: Arc<dyn AudioGraph>,
    pipeline: AcquisitionPipeline,
    events: EventBus,
    cancel: Arc<CancelSlot>,
    tick_interval: Duration,
    state: Mutex<TagState>,
}

impl Drop for TagInner {
    fn drop(&mut self) {
        if let Some(ticker) = self.state.get_mut().ticker.take() {
            ticker.abort();
        }
    }
}

struct WeakTag {
    inner: Weak<TagInner>,
}

impl WeakTag {
    fn upgrade(&self) -> Option<AudioTag> {
        self.inner.upgrade().map(|inner| AudioTag { inner })
    }
}

/// Playback controller for one audio source at a time.
///
/// Cloning is cheap and clones share all state, like handles to the same
/// underlying player.
#[derive(Clone)]
pub struct AudioTag {
    inner: Arc<TagInner>,
}

impl AudioTag {
    /// Build a controller over the given host capabilities.
    ///
    /// The graph is expected to start suspended; nothing plays until
    /// [`play`](AudioTag::play) is called. Out-of-range configuration
    /// values are replaced with their defaults with a warning, matching
    /// how property assignment treats them later.
    pub fn new(
        graph: Arc<dyn AudioGraph>,
        decoder: Arc<dyn AudioDecoder>,
        transport: Arc<dyn MediaTransport>,
        config: TagConfig,
    ) -> Self {
        let volume = if (0.0..=1.0).contains(&config.volume) {
            config.volume
        } else {
            warn!("{}", TagError::InvalidVolume(config.volume));
            TagConfig::default().volume
        };
        let capacity = if config.event_capacity == 0 {
            warn!("event_capacity must be greater than zero, using default");
            TagConfig::default().event_capacity
        } else {
            config.event_capacity
        };

        graph.set_gain(if config.muted { 0.0 } else { volume });

        let events = EventBus::new(capacity);
        let cancel = Arc::new(CancelSlot::new());
        let pipeline = AcquisitionPipeline::new(
            transport,
            decoder,
            events.clone(),
            Arc::clone(&cancel),
        );

        Self {
            inner: Arc::new(TagInner {
                graph,
                pipeline,
                events,
                cancel,
                tick_interval: config.time_update_interval,
                state: Mutex::new(TagState {
                    src: config.src,
                    volume,
                    muted: config.muted,
                    looping: config.looping,
                    start_time: None,
                    generation: 0,
                    slot: Slot::empty(),
                    ticker: None,
                }),
            }),
        }
    }

    fn downgrade(&self) -> WeakTag {
        WeakTag {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ------------------------------------------------------------------
    // Transport controls
    // ------------------------------------------------------------------

    /// Start or resume playback of the current source, optionally from
    /// `offset` seconds into the content.
    ///
    /// When the controller is paused on the same unfinished source and
    /// looping is off, the call is a plain resume: the suspended node picks
    /// up where it left off and `offset` is ignored.
    ///
    /// Returns `true` once audio is running, `false` when the call was
    /// superseded by a newer one or the source could not be made playable.
    /// Acquisition failures report detail through an `error` event; a node
    /// that fails to start only logs.
    #[instrument(skip(self))]
    pub async fn play(&self, offset: Option<f64>) -> bool {
        let offset = match offset {
            Some(value) if !value.is_finite() || value < 0.0 => {
                warn!("{}", TagError::InvalidPosition(value));
                0.0
            }
            Some(value) => value,
            None => 0.0,
        };

        if self.inner.graph.is_suspended() {
            if let Err(err) = self.inner.graph.resume().await {
                warn!(error = %err, "failed to resume audio graph");
            }
            self.start_ticker();
            self.inner.events.emit(TagEvent::PlayStateChange {
                state: PlayState::Playing,
            });

            // Same source, not finished, not looping: the suspended node
            // picks up where it left off and nothing needs reloading.
            let state = self.inner.state.lock();
            if state.slot.url == state.src && !state.slot.ended && !state.looping {
                debug!(src = %state.src, "resumed current source");
                return true;
            }
        }

        // A newer request always wins over an in-flight acquisition.
        if let Some(kind) = self.inner.cancel.take_and_cancel() {
            debug!(%kind, "cancelled in-flight acquisition");
        }

        let (src, reusable) = {
            let mut state = self.inner.state.lock();
            let src = state.src.clone();
            let reusable = if state.slot.url == src {
                state.slot.buffer.clone()
            } else {
                None
            };
            if state.slot.node.is_some() {
                Self::teardown_locked(&mut state);
            }
            (src, reusable)
        };

        let buffer = match reusable {
            Some(buffer) => {
                debug!(src = %src, "reusing decoded buffer");
                Some(buffer)
            }
            None => self.inner.pipeline.acquire(&src).await,
        };
        let Some(buffer) = buffer else {
            return false;
        };

        let (generation, completion) = {
            let mut state = self.inner.state.lock();
            // A concurrent play may have installed its node while this
            // call was acquiring; there is only ever one live node.
            if state.slot.node.is_some() {
                Self::teardown_locked(&mut state);
            }
            let now = self.inner.graph.now();
            let source =
                match self
                    .inner
                    .graph
                    .start_source(Arc::clone(&buffer), now, offset)
                {
                    Ok(source) => source,
                    Err(err) => {
                        error!(error = %err, src = %src, "failed to start source node");
                        return false;
                    }
                };
            state.generation += 1;
            state.slot = Slot {
                url: src.clone(),
                buffer: Some(buffer),
                node: Some(source.handle),
                ended: false,
            };
            state.start_time = Some(now - offset);
            (state.generation, source.completion)
        };
        self.spawn_completion_listener(completion, generation);

        info!(src = %src, offset, "playback started");
        true
    }

    /// Suspend playback, freezing the position.
    ///
    /// Returns `false` when already paused.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> bool {
        if self.inner.graph.is_suspended() {
            return false;
        }
        if let Err(err) = self.inner.graph.suspend().await {
            warn!(error = %err, "failed to suspend audio graph");
        }
        self.stop_ticker();
        self.inner.events.emit(TagEvent::PlayStateChange {
            state: PlayState::Paused,
        });
        debug!("playback paused");
        true
    }

    /// Restart the current source from `position` seconds.
    ///
    /// Returns `false` without side effects when `position` is negative
    /// or not finite.
    pub async fn seek(&self, position: f64) -> bool {
        if !position.is_finite() || position < 0.0 {
            warn!("{}", TagError::InvalidPosition(position));
            return false;
        }
        self.play(Some(position)).await
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Set the volume. Values outside `[0.0, 1.0]` are rejected with a
    /// warning and `false`; the previous volume stays in effect.
    ///
    /// A valid assignment always emits `volumeChange`, even while muted.
    pub fn set_volume(&self, volume: f32) -> bool {
        if !(0.0..=1.0).contains(&volume) {
            warn!("{}", TagError::InvalidVolume(volume));
            return false;
        }
        {
            let mut state = self.inner.state.lock();
            state.volume = volume;
            if !state.muted {
                self.inner.graph.set_gain(volume);
            }
        }
        self.inner.events.emit(TagEvent::VolumeChange { volume });
        true
    }

    pub fn volume(&self) -> f32 {
        self.inner.state.lock().volume
    }

    /// Mute or unmute without touching the stored volume.
    ///
    /// No dedicated event accompanies mute changes; observers see the
    /// effect only through the gain stage. `volumeChange` stays reserved
    /// for volume assignments.
    pub fn set_muted(&self, muted: bool) {
        let mut state = self.inner.state.lock();
        state.muted = muted;
        let gain = if muted { 0.0 } else { state.volume };
        self.inner.graph.set_gain(gain);
    }

    pub fn muted(&self) -> bool {
        self.inner.state.lock().muted
    }

    /// Enable or disable replay-on-completion. Takes effect at whatever
    /// completion happens next.
    pub fn set_looping(&self, looping: bool) {
        self.inner.state.lock().looping = looping;
    }

    pub fn looping(&self) -> bool {
        self.inner.state.lock().looping
    }

    /// Change the source URL. When the controller is not paused and the
    /// new source is non-empty, playback switches to it immediately.
    pub async fn set_src(&self, src: impl Into<String>) {
        let src = src.into();
        let switch = {
            let mut state = self.inner.state.lock();
            state.src = src.clone();
            !src.is_empty()
        } && !self.paused();

        if switch {
            debug!(src = %src, "source changed while playing");
            self.play(None).await;
        }
    }

    pub fn src(&self) -> String {
        self.inner.state.lock().src.clone()
    }

    /// Playback position in seconds, `0.0` when nothing is running.
    /// Frozen while paused because the graph clock is frozen.
    pub fn current_time(&self) -> f64 {
        let state = self.inner.state.lock();
        match state.start_time {
            Some(started) => self.inner.graph.now() - started,
            None => 0.0,
        }
    }

    /// Duration of the decoded source in seconds, `0.0` when none is
    /// loaded.
    pub fn duration(&self) -> f64 {
        let state = self.inner.state.lock();
        state
            .slot
            .buffer
            .as_ref()
            .map_or(0.0, |buffer| buffer.duration())
    }

    pub fn paused(&self) -> bool {
        self.inner.graph.is_suspended()
    }

    /// Coarse state derived from the graph, mirroring what
    /// `playStateChange` reports.
    pub fn play_state(&self) -> PlayState {
        if self.paused() {
            PlayState::Paused
        } else {
            PlayState::Playing
        }
    }

    /// Detailed lifecycle phase.
    pub fn phase(&self) -> PlaybackPhase {
        if self.inner.cancel.is_active() {
            return PlaybackPhase::Loading;
        }
        let suspended = self.inner.graph.is_suspended();
        let state = self.inner.state.lock();
        if state.slot.node.is_some() {
            if state.slot.ended {
                PlaybackPhase::Ended
            } else if suspended {
                PlaybackPhase::Paused
            } else {
                PlaybackPhase::Playing
            }
        } else {
            PlaybackPhase::Idle
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a callback for one event kind. See [`EventBus::on`].
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&TagEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    /// Remove a previously registered callback. See [`EventBus::off`].
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.inner.events.off(kind, id)
    }

    /// Subscribe to every event on a broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TagEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Detach and stop the current node and reset the slot. The
    /// generation bump detaches any completion listener installed for
    /// the node.
    fn teardown_locked(state: &mut TagState) {
        state.start_time = None;
        state.generation += 1;
        if let Some(node) = state.slot.node.take() {
            node.stop(0.0);
            node.disconnect();
        }
        state.slot = Slot::empty();
    }

    fn spawn_completion_listener(
        &self,
        completion: oneshot::Receiver<()>,
        generation: u64,
    ) {
        let weak = self.downgrade();
        tokio::spawn(async move {
            // The sender is dropped when the node is stopped or
            // disconnected; only natural completion resolves with Ok.
            if completion.await.is_err() {
                return;
            }
            let Some(tag) = weak.upgrade() else {
                return;
            };
            tag.handle_completion(generation).await;
        });
    }

    /// React to a source playing to its natural end.
    async fn handle_completion(&self, generation: u64) {
        let looping = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                debug!(
                    generation,
                    current = state.generation,
                    "ignoring stale completion"
                );
                return;
            }
            state.start_time = None;
            state.looping
        };

        if let Err(err) = self.inner.graph.suspend().await {
            warn!(error = %err, "failed to suspend audio graph");
        }
        self.inner.events.emit(TagEvent::PlayStateChange {
            state: PlayState::Paused,
        });
        self.stop_ticker();

        {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.slot.ended = true;
            }
        }
        self.inner.events.emit(TagEvent::Ended);
        debug!("playback ended");

        if looping {
            debug!("looping, replaying from the start");
            self.play(None).await;
        }
    }

    /// Start the periodic `timeUpdate` reporter, replacing any previous
    /// one. There is at most one ticker per controller.
    fn start_ticker(&self) {
        let weak = self.downgrade();
        let interval = self.inner.tick_interval;
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(tag) = weak.upgrade() else {
                    break;
                };
                let current_time = tag.current_time();
                tag.inner
                    .events
                    .emit(TagEvent::TimeUpdate { current_time });
            }
        });
        let mut state = self.inner.state.lock();
        if let Some(old) = state.ticker.replace(task) {
            old.abort();
        }
    }

    fn stop_ticker(&self) {
        let task = self.inner.state.lock().ticker.take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl std::fmt::Debug for AudioTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTag")
            .field("src", &self.src())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
