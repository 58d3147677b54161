//! Transport contract: source URL in, byte stream out.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{HostError, Result};

/// An open byte stream for one media source.
pub struct MediaStream {
    /// Total payload size in bytes when the host knows it up front,
    /// `None` otherwise. Progress reporting falls back to a zero
    /// percentage when the total is unknown.
    pub total_len: Option<u64>,
    /// Ordered chunks of the payload. The stream ends after the final
    /// chunk; an `Err` item aborts the transfer.
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

impl MediaStream {
    /// Wrap an already-complete payload as a single-chunk stream.
    pub fn from_bytes(data: Bytes) -> Self {
        let total_len = Some(data.len() as u64);
        Self {
            total_len,
            chunks: stream::iter([Ok(data)]).boxed(),
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("total_len", &self.total_len)
            .finish_non_exhaustive()
    }
}

/// Opens media sources for the acquisition pipeline.
///
/// `open` resolves once headers are in and the body is ready to stream;
/// transfer failures after that point surface as `Err` items on
/// [`MediaStream::chunks`].
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<MediaStream>;
}

/// Blanket transport for closures that already hold the payload, useful
/// when the caller fetches bytes through its own channel.
pub struct PreloadedTransport<F>(pub F);

#[async_trait]
impl<F> MediaTransport for PreloadedTransport<F>
where
    F: Fn(&str) -> std::result::Result<Bytes, String> + Send + Sync,
{
    async fn open(&self, url: &str) -> Result<MediaStream> {
        let data = (self.0)(url).map_err(HostError::Transport)?;
        Ok(MediaStream::from_bytes(data))
    }
}
