//! HTTP transport for the activity stream.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, error};

use crate::config::Credentials;
use crate::error::{EdcError, Result};

/// Opens long-lived, gzip-capable streaming GETs against a collector.
#[derive(Clone)]
pub struct StreamClient {
    http_client: reqwest::Client,
}

impl StreamClient {
    /// Create a client. Responses are requested gzip-compressed and
    /// decompressed transparently.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| EdcError::connection_with_source("failed to build HTTP client", e))?;
        Ok(Self { http_client })
    }

    /// Send the authenticated GET and return the body as a chunk stream.
    ///
    /// No timeout is applied to the request or the body; the stream ends
    /// only when the server closes it.
    pub async fn open(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        debug!(endpoint, user = %credentials.user_name, "opening stream");

        let response = self
            .http_client
            .get(endpoint)
            .basic_auth(&credentials.user_name, Some(credentials.password.expose()))
            .send()
            .await
            .map_err(|e| EdcError::connection_with_source(format!("cannot reach {endpoint}"), e))?;

        let status = response.status();
        if !status.is_success() {
            error!(endpoint, status = status.as_u16(), "stream request rejected");
            return Err(EdcError::HttpStatus {
                status: status.as_u16(),
                url: endpoint.to_string(),
            });
        }

        Ok(response.bytes_stream().boxed())
    }
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient").finish_non_exhaustive()
    }
}
