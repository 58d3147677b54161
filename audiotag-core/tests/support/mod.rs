#![allow(dead_code)]

//! Shared fixtures: a manual-clock audio graph, a scripted transport, and
//! canned decoders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, Notify};

use audiotag_core::events::{EventKind, TagEvent};
use audiotag_traits::{
    ActiveSource, AudioBuffer, AudioDecoder, AudioGraph, HostError, MediaStream,
    MediaTransport, Result, SourceHandle,
};

// ----------------------------------------------------------------------
// Audio graph
// ----------------------------------------------------------------------

/// In-memory graph with a manually advanced clock. Starts suspended, and
/// the clock only moves while running, mirroring the contract real graphs
/// follow.
#[derive(Clone)]
pub struct TestGraph {
    inner: Arc<Mutex<GraphInner>>,
}

struct GraphInner {
    suspended: bool,
    clock: f64,
    gains: Vec<f32>,
    suspend_calls: usize,
    resume_calls: usize,
    nodes: Vec<NodeRecord>,
    fail_next_start: bool,
}

struct NodeRecord {
    when: f64,
    offset: f64,
    frames: usize,
    stopped: bool,
    disconnected: bool,
    sender: Option<oneshot::Sender<()>>,
}

/// Snapshot of one started node for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub when: f64,
    pub offset: f64,
    pub frames: usize,
    pub stopped: bool,
    pub disconnected: bool,
}

impl TestGraph {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GraphInner {
                suspended: true,
                clock: 0.0,
                gains: Vec::new(),
                suspend_calls: 0,
                resume_calls: 0,
                nodes: Vec::new(),
                fail_next_start: false,
            })),
        }
    }

    /// Advance the clock by `seconds`. Ignored while suspended.
    pub fn advance(&self, seconds: f64) {
        let mut inner = self.inner.lock();
        if !inner.suspended {
            inner.clock += seconds;
        }
    }

    /// Fire the natural-completion signal of node `index`.
    pub fn complete(&self, index: usize) {
        let sender = self.inner.lock().nodes[index]
            .sender
            .take()
            .expect("node already completed or torn down");
        sender.send(()).expect("completion listener dropped");
    }

    pub fn fail_next_start(&self) {
        self.inner.lock().fail_next_start = true;
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    pub fn node(&self, index: usize) -> NodeInfo {
        let inner = self.inner.lock();
        let record = &inner.nodes[index];
        NodeInfo {
            when: record.when,
            offset: record.offset,
            frames: record.frames,
            stopped: record.stopped,
            disconnected: record.disconnected,
        }
    }

    pub fn gains(&self) -> Vec<f32> {
        self.inner.lock().gains.clone()
    }

    pub fn last_gain(&self) -> Option<f32> {
        self.inner.lock().gains.last().copied()
    }

    pub fn suspend_calls(&self) -> usize {
        self.inner.lock().suspend_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.inner.lock().resume_calls
    }
}

struct TestSourceHandle {
    index: usize,
    inner: Arc<Mutex<GraphInner>>,
}

impl SourceHandle for TestSourceHandle {
    fn stop(&self, _when: f64) {
        let mut inner = self.inner.lock();
        let record = &mut inner.nodes[self.index];
        record.stopped = true;
        record.sender.take();
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        let record = &mut inner.nodes[self.index];
        record.disconnected = true;
        record.sender.take();
    }
}

#[async_trait]
impl AudioGraph for TestGraph {
    async fn suspend(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.suspended = true;
        inner.suspend_calls += 1;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.suspended = false;
        inner.resume_calls += 1;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.inner.lock().suspended
    }

    fn now(&self) -> f64 {
        self.inner.lock().clock
    }

    fn set_gain(&self, gain: f32) {
        self.inner.lock().gains.push(gain);
    }

    fn start_source(
        &self,
        buffer: Arc<AudioBuffer>,
        when: f64,
        offset: f64,
    ) -> Result<ActiveSource> {
        let mut inner = self.inner.lock();
        if inner.fail_next_start {
            inner.fail_next_start = false;
            return Err(HostError::OperationFailed("start refused".to_string()));
        }
        let (sender, completion) = oneshot::channel();
        let index = inner.nodes.len();
        inner.nodes.push(NodeRecord {
            when,
            offset,
            frames: buffer.frames(),
            stopped: false,
            disconnected: false,
            sender: Some(sender),
        });
        Ok(ActiveSource {
            handle: Box::new(TestSourceHandle {
                index,
                inner: Arc::clone(&self.inner),
            }),
            completion,
        })
    }
}

// ----------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------

enum OpenScript {
    Chunks {
        chunks: Vec<Bytes>,
        total: Option<u64>,
    },
    Manual {
        receiver: mpsc::UnboundedReceiver<Result<Bytes>>,
        total: Option<u64>,
    },
    Fail(String),
}

/// Transport that replays a queue of scripted responses, one per `open`
/// call, and records every requested URL. An unscripted `open` panics so
/// tests catch unexpected fetches.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<TransportInner>>,
}

struct TransportInner {
    scripts: VecDeque<OpenScript>,
    opens: Vec<String>,
}

/// Feeds a manually scripted transfer chunk by chunk.
pub struct ManualFeed {
    sender: mpsc::UnboundedSender<Result<Bytes>>,
}

impl ManualFeed {
    pub fn chunk(&self, data: &[u8]) {
        self.sender
            .send(Ok(Bytes::copy_from_slice(data)))
            .expect("transfer no longer reading");
    }

    pub fn error(&self, message: &str) {
        self.sender
            .send(Err(HostError::Transport(message.to_string())))
            .expect("transfer no longer reading");
    }

    /// End the stream successfully by dropping the sender.
    pub fn finish(self) {}
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TransportInner {
                scripts: VecDeque::new(),
                opens: Vec::new(),
            })),
        }
    }

    /// Queue a single-chunk response with a known total length.
    pub fn enqueue_bytes(&self, data: &[u8]) {
        self.enqueue_chunks(
            vec![Bytes::copy_from_slice(data)],
            Some(data.len() as u64),
        );
    }

    pub fn enqueue_chunks(&self, chunks: Vec<Bytes>, total: Option<u64>) {
        self.inner
            .lock()
            .scripts
            .push_back(OpenScript::Chunks { chunks, total });
    }

    pub fn enqueue_fail(&self, message: &str) {
        self.inner
            .lock()
            .scripts
            .push_back(OpenScript::Fail(message.to_string()));
    }

    /// Queue a response the test feeds by hand.
    pub fn enqueue_manual(&self, total: Option<u64>) -> ManualFeed {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .scripts
            .push_back(OpenScript::Manual { receiver, total });
        ManualFeed { sender }
    }

    pub fn opens(&self) -> Vec<String> {
        self.inner.lock().opens.clone()
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().opens.len()
    }
}

#[async_trait]
impl MediaTransport for ScriptedTransport {
    async fn open(&self, url: &str) -> Result<MediaStream> {
        let script = {
            let mut inner = self.inner.lock();
            inner.opens.push(url.to_string());
            inner
                .scripts
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted transport open for '{url}'"))
        };
        match script {
            OpenScript::Chunks { chunks, total } => Ok(MediaStream {
                total_len: total,
                chunks: Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))),
            }),
            OpenScript::Manual { receiver, total } => Ok(MediaStream {
                total_len: total,
                chunks: Box::pin(futures::stream::unfold(receiver, |mut rx| async {
                    rx.recv().await.map(|item| (item, rx))
                })),
            }),
            OpenScript::Fail(message) => Err(HostError::Transport(message)),
        }
    }
}

// ----------------------------------------------------------------------
// Decoders
// ----------------------------------------------------------------------

/// Decodes `n` payload bytes into `n` mono frames at 1 kHz, so a payload
/// of 500 bytes becomes half a second of audio.
#[derive(Clone)]
pub struct InstantDecoder {
    calls: Arc<AtomicUsize>,
}

pub const DECODE_SAMPLE_RATE: u32 = 1_000;

impl InstantDecoder {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDecoder for InstantDecoder {
    async fn decode(&self, data: Bytes) -> Result<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AudioBuffer::new(
            vec![0.0; data.len()],
            1,
            DECODE_SAMPLE_RATE,
        ))
    }
}

/// Decoder that blocks until the test releases its gate, for exercising
/// the window between transfer completion and decode completion.
#[derive(Clone)]
pub struct GatedDecoder {
    gate: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedDecoder {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Release one pending (or the next) decode call.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDecoder for GatedDecoder {
    async fn decode(&self, data: Bytes) -> Result<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(AudioBuffer::new(
            vec![0.0; data.len()],
            1,
            DECODE_SAMPLE_RATE,
        ))
    }
}

/// Decoder that always fails with the given message.
pub struct FailingDecoder(pub &'static str);

#[async_trait]
impl AudioDecoder for FailingDecoder {
    async fn decode(&self, _data: Bytes) -> Result<AudioBuffer> {
        Err(HostError::Decode(self.0.to_string()))
    }
}

// ----------------------------------------------------------------------
// Event helpers
// ----------------------------------------------------------------------

/// Collect everything already sitting in the broadcast channel.
pub fn drain(rx: &mut broadcast::Receiver<TagEvent>) -> Vec<TagEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn kinds_of(events: &[TagEvent]) -> Vec<EventKind> {
    events.iter().map(TagEvent::kind).collect()
}

pub fn count_kind(events: &[TagEvent], kind: EventKind) -> usize {
    events.iter().filter(|event| event.kind() == kind).count()
}

/// Wait for the next event of `kind`, discarding others.
pub async fn next_event_of(
    rx: &mut broadcast::Receiver<TagEvent>,
    kind: EventKind,
) -> TagEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if event.kind() == kind {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind} event"))
}

/// Sleep-poll until `condition` holds. The short sleep keeps the timer
/// driver running so the timeout can fire if the condition never does.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}
