use std::time::Duration;

/// Configuration for the HTTP chat client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the chat API (scheme and host, no trailing path).
    pub base_url: String,
    /// Timeout for establishing the connection.
    ///
    /// There is deliberately no whole-request timeout: a healthy stream may
    /// stay open for minutes. Callers wanting a deadline compose one with
    /// `CancelHandle::cancel`.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with default timeouts for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/api/v1/chat/ai-response/stream",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_trims_trailing_slash() {
        let config = ClientConfig::new("https://api.example.com/");
        assert_eq!(
            config.stream_url(),
            "https://api.example.com/api/v1/chat/ai-response/stream"
        );
    }
}
