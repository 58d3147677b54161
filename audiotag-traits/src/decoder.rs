//! Decoder contract: encoded payload in, PCM buffer out.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::graph::AudioBuffer;

/// Decodes one complete encoded payload into an interleaved PCM buffer.
///
/// The whole payload is available up front; implementations are free to
/// move the work onto a blocking thread.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn decode(&self, data: Bytes) -> Result<AudioBuffer>;
}
