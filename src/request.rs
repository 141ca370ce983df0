use serde_json::{Map, Value};

/// Kind of assistant reply being requested.
///
/// Serialized as the `type` field of the request body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Conversational reply.
    #[default]
    Chat,
    /// Research-style reply with structured follow-up data.
    Research,
}

/// Body of one streaming chat request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    /// User message to answer.
    pub message: String,
    /// Conversation to append to; omitted for a new conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl ChatRequest {
    /// Creates a chat request for a new conversation.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            kind: MessageKind::default(),
        }
    }

    /// Targets an existing conversation.
    pub fn conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Sets the reply kind.
    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }
}

/// How a clean end-of-stream without an explicit completion frame is treated.
///
/// Servers may omit the final `done` frame on simple completions, so the
/// default treats a clean close as success. Callers that must detect
/// truncation can require the marker instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Clean close completes the session with empty metadata.
    #[default]
    CompleteOnCleanClose,
    /// Clean close without a completion frame fails the session.
    RequireCompletionFrame,
}

/// Per-session behavior options.
#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Bounded event buffer size between the session task and the consumer.
    pub buffer_capacity: usize,
    /// Clean-close policy, see `ClosePolicy`.
    pub close_policy: ClosePolicy,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 128,
            close_policy: ClosePolicy::default(),
        }
    }
}

impl StreamOptions {
    /// Sets the event buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Sets the clean-close policy.
    pub fn close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }
}

/// Final aggregated reply for a completed session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatReply {
    /// All chunk text concatenated in delivery order.
    pub text: String,
    /// Metadata from the completion frame, empty when the server sent none.
    pub metadata: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_type_and_omits_missing_conversation() {
        let body = serde_json::to_value(ChatRequest::new("hello")).expect("serialize");
        assert_eq!(body.get("message").and_then(Value::as_str), Some("hello"));
        assert_eq!(body.get("type").and_then(Value::as_str), Some("chat"));
        assert!(body.get("conversation_id").is_none());
    }

    #[test]
    fn request_carries_conversation_and_kind() {
        let request = ChatRequest::new("more")
            .conversation_id("c-123")
            .kind(MessageKind::Research);
        let body = serde_json::to_value(request).expect("serialize");
        assert_eq!(
            body.get("conversation_id").and_then(Value::as_str),
            Some("c-123")
        );
        assert_eq!(body.get("type").and_then(Value::as_str), Some("research"));
    }

    #[test]
    fn stream_options_default_buffer_capacity() {
        assert_eq!(StreamOptions::default().buffer_capacity, 128);
    }
}
