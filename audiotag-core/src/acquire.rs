//! Buffer acquisition pipeline: streaming fetch followed by decode.
//!
//! `acquire` is the only entry point. It reports transfer progress on the
//! event bus, keeps the controller's cancellation slot current as the
//! acquisition moves from transfer into decode, and resolves to `None` for
//! both failures and cancellations. Failures additionally emit an `error`
//! event; cancellations never do.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use audiotag_traits::{AudioBuffer, AudioDecoder, MediaTransport};

use crate::cancel::CancelSlot;
use crate::error::TagError;
use crate::events::{EventBus, TagEvent};

const FETCH_ERROR_MESSAGE: &str = "failed to fetch audio bytes";
const DECODE_ERROR_MESSAGE: &str = "failed to decode audio data";

enum Transfer {
    Complete(Bytes),
    Aborted,
}

/// Streams a source's bytes through the transport and decodes them.
#[derive(Clone)]
pub struct AcquisitionPipeline {
    transport: Arc<dyn MediaTransport>,
    decoder: Arc<dyn AudioDecoder>,
    events: EventBus,
    cancel: Arc<CancelSlot>,
}

impl AcquisitionPipeline {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        decoder: Arc<dyn AudioDecoder>,
        events: EventBus,
        cancel: Arc<CancelSlot>,
    ) -> Self {
        Self {
            transport,
            decoder,
            events,
            cancel,
        }
    }

    /// Fetch and decode `src`.
    ///
    /// Returns `None` when the transport or decoder fails (after emitting
    /// an `error` event) and when the acquisition is cancelled (silently).
    #[instrument(skip(self))]
    pub async fn acquire(&self, src: &str) -> Option<Arc<AudioBuffer>> {
        let token = CancellationToken::new();
        let id = self.cancel.begin(&token);

        let data = match self.transfer(src, &token).await {
            Ok(Transfer::Complete(data)) => data,
            Ok(Transfer::Aborted) => {
                debug!("transfer aborted by a newer request");
                self.cancel.finish(id);
                return None;
            }
            Err(err) => {
                error!(error = %err, "transfer failed");
                self.cancel.finish(id);
                self.events.emit(TagEvent::Error {
                    message: FETCH_ERROR_MESSAGE.to_string(),
                    error: err.to_string(),
                });
                return None;
            }
        };

        // Transfer done; cancellation from here on means the decoded
        // buffer is thrown away rather than the work being interrupted.
        self.cancel.advance(id, &token);

        let decoded = self.decoder.decode(data).await;
        self.cancel.finish(id);

        match decoded {
            Ok(_) if token.is_cancelled() => {
                debug!("decoded buffer discarded, request was superseded");
                None
            }
            Ok(buffer) => {
                debug!(
                    duration = buffer.duration(),
                    channels = buffer.channels,
                    sample_rate = buffer.sample_rate,
                    "decode complete"
                );
                self.events.emit(TagEvent::Loaded);
                Some(Arc::new(buffer))
            }
            Err(err) => {
                error!(error = %err, "decode failed");
                self.events.emit(TagEvent::Error {
                    message: DECODE_ERROR_MESSAGE.to_string(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// Stream the payload, emitting a `progress` event per chunk.
    async fn transfer(
        &self,
        src: &str,
        token: &CancellationToken,
    ) -> Result<Transfer, TagError> {
        let mut stream = tokio::select! {
            _ = token.cancelled() => return Ok(Transfer::Aborted),
            opened = self.transport.open(src) => {
                opened.map_err(|err| TagError::transport(src, err))?
            }
        };

        // The claimed length is unverified wire input; it feeds the
        // progress math below and never an allocation size.
        let total = stream.total_len;
        let mut received = BytesMut::new();

        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => return Ok(Transfer::Aborted),
                chunk = stream.chunks.next() => chunk,
            };
            match chunk {
                Some(Ok(data)) => {
                    received.extend_from_slice(&data);
                    let percentage = match total {
                        Some(len) if len > 0 => {
                            received.len() as f32 / len as f32 * 100.0
                        }
                        _ => 0.0,
                    };
                    self.events.emit(TagEvent::Progress {
                        src: src.to_string(),
                        percentage,
                        chunked: received.len() as u64,
                    });
                }
                Some(Err(err)) => return Err(TagError::transport(src, err)),
                None => break,
            }
        }

        debug!(received = received.len(), total, "transfer complete");
        Ok(Transfer::Complete(received.freeze()))
    }
}

impl std::fmt::Debug for AcquisitionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionPipeline").finish_non_exhaustive()
    }
}
