//! HTTP media transport built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::debug;

use audiotag_traits::{HostError, MediaStream, MediaTransport, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Streams media sources over HTTP(S).
///
/// No overall request timeout is set: payloads can be large and the
/// controller aborts stalled transfers itself by cancelling the
/// acquisition.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .user_agent(format!("audiotag/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                HostError::OperationFailed(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { client })
    }

    /// Use an externally configured client, e.g. one with custom proxy or
    /// TLS settings.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaTransport for HttpTransport {
    async fn open(&self, url: &str) -> Result<MediaStream> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| HostError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Transport(format!("HTTP status {status}")));
        }

        let total_len = response.content_length();
        debug!(url, total_len, status = %status, "opened media stream");

        let chunks = response
            .bytes_stream()
            .map_err(|err| HostError::Transport(err.to_string()))
            .boxed();

        Ok(MediaStream { total_len, chunks })
    }
}
