/// Errors raised while opening or reading the streaming transport, before
/// they are normalized into a terminal `StreamFailure`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Server answered with a non-2xx status before any stream was delivered.
    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    /// Request or stream I/O failed.
    #[error("network error: {message}")]
    Network { message: String },
}

impl TransportError {
    /// Creates a network-level error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error with the response body captured so far.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }
}

/// Terminal failure delivered through `StreamEvent::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamFailure {
    /// The server emitted an explicit error frame.
    #[error("server error: {message}")]
    Server { message: String },
    /// Transport failed mid-stream or before the stream was established.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The stream closed cleanly without a completion frame and the session
    /// was configured to require one.
    #[error("stream ended without completion marker")]
    Truncated,
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Terminal failure reported by a started session.
    #[error(transparent)]
    Failed(StreamFailure),
    /// The session was cancelled by the caller before a terminal event.
    #[error("stream cancelled")]
    Cancelled,
    /// Internal invariant violation (for example a session task that went
    /// away without producing a terminal event).
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub(crate) fn failure_from_transport(err: TransportError) -> StreamFailure {
    match err {
        TransportError::Http { status, body } => StreamFailure::Transport {
            message: format!("status {status}: {body}"),
        },
        TransportError::Network { message } => StreamFailure::Transport { message },
    }
}
