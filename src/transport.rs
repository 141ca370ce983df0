use std::pin::Pin;

use futures::StreamExt as _;

use crate::config::ClientConfig;
use crate::errors::{StreamError, TransportError};
use crate::request::ChatRequest;

/// Ordered raw byte deltas from one streaming response.
///
/// Delta boundaries are a transport detail; a delta may hold zero, one, or
/// many frames and may end mid-frame.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Seam between the session machinery and the network.
///
/// One `open` call issues one streaming request and exposes its body without
/// interpreting it. Dropping the returned stream aborts the in-flight
/// request, which is how cancellation releases the connection.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Issues the streaming request with the caller-supplied bearer token.
    ///
    /// A non-2xx status is reported as `TransportError::Http` with the
    /// response body captured so far; it never surfaces through the delta
    /// stream.
    async fn open(&self, request: &ChatRequest, token: &str) -> Result<ByteStream, TransportError>;
}

/// reqwest-backed transport for the chat API.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Builds the transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        if config.base_url.trim().is_empty() {
            return Err(StreamError::Config("base_url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest, token: &str) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(self.config.stream_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::network(format!("chat stream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(status.as_u16(), body));
        }

        let deltas = response
            .bytes_stream()
            .map(|item| item.map_err(|e| TransportError::network(format!("stream read failed: {e}"))));
        Ok(Box::pin(deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let err = HttpTransport::new(ClientConfig::new("  "));
        assert!(matches!(
            err,
            Err(StreamError::Config(message)) if message.contains("base_url")
        ));
    }
}
