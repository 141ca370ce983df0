use std::sync::Arc;

use crate::config::ClientConfig;
use crate::errors::StreamError;
use crate::request::{ChatRequest, StreamOptions};
use crate::session::{self, ChatStream};
use crate::transport::{HttpTransport, StreamTransport};

/// Entry point for issuing streaming chat requests.
///
/// The client is cheap to clone and holds no per-session state; each
/// `start_stream` call creates an independent session with its own decoder
/// and cancellation handle.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn StreamTransport>,
    options: StreamOptions,
}

impl ChatClient {
    /// Creates a client backed by the HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Creates a client over a custom transport (used by tests and by hosts
    /// with their own network layer).
    pub fn with_transport(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            options: StreamOptions::default(),
        }
    }

    /// Overrides the default per-session options.
    pub fn stream_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the request and starts a streaming session.
    ///
    /// The bearer token is supplied by the caller's auth layer; the client
    /// never reaches into ambient storage for it. The returned handle is
    /// available immediately; connect failures arrive as the session's
    /// terminal event.
    pub fn start_stream(
        &self,
        request: ChatRequest,
        token: impl Into<String>,
    ) -> Result<ChatStream, StreamError> {
        let token = token.into();
        if request.message.trim().is_empty() {
            return Err(StreamError::Validation("message must not be empty".into()));
        }
        if token.trim().is_empty() {
            return Err(StreamError::Validation("token must not be empty".into()));
        }
        if self.options.buffer_capacity == 0 {
            return Err(StreamError::Validation(
                "buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(session::spawn(
            self.transport.clone(),
            request,
            token,
            self.options.clone(),
        ))
    }
}
