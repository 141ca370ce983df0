use serde_json::{Map, Value};
use tracing::warn;

use crate::decoder::Frame;

/// One interpreted stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// One increment of assistant text.
    Chunk { text: String },
    /// Terminal success marker; metadata may be empty.
    Completion { metadata: Map<String, Value> },
    /// Terminal failure declared by the server.
    ServerError { message: String },
}

/// Interprets frame payloads into `ChatEvent`s.
///
/// A malformed payload is skipped with a diagnostic and the stream continues;
/// only well-formed terminal payloads end a session.
#[derive(Default)]
pub struct EventRouter {
    malformed: u64,
}

impl EventRouter {
    /// Routes one frame.
    ///
    /// Returns `None` for malformed JSON and for payloads matching no known
    /// shape (unknown keep-alives). When a payload satisfies more than one
    /// shape, `error` wins over `done` wins over `content`, since error is
    /// terminal.
    pub fn route(&mut self, frame: &Frame) -> Option<ChatEvent> {
        let payload = frame.payload.trim();
        if payload.is_empty() {
            return None;
        }
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                self.malformed += 1;
                warn!(error = %err, "skipping malformed stream frame");
                return None;
            }
        };

        if let Some(error) = value.get("error").filter(|v| !v.is_null()) {
            let message = match error.as_str() {
                Some(message) => message.to_string(),
                None => error.to_string(),
            };
            return Some(ChatEvent::ServerError { message });
        }
        if value.get("done").is_some_and(is_truthy) {
            let metadata = value
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            return Some(ChatEvent::Completion { metadata });
        }
        if let Some(text) = value.get("content").and_then(Value::as_str) {
            return Some(ChatEvent::Chunk {
                text: text.to_string(),
            });
        }
        None
    }

    /// Number of frames dropped because their payload was not valid JSON.
    pub fn malformed_frames(&self) -> u64 {
        self.malformed
    }
}

// The server is JavaScript; `done` is documented as truthy, not strictly boolean.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &str) -> Frame {
        Frame {
            payload: payload.to_string(),
        }
    }

    #[test]
    fn routes_content_to_chunk() {
        let mut router = EventRouter::default();
        let event = router.route(&frame("{\"content\":\"hello\"}"));
        assert_eq!(
            event,
            Some(ChatEvent::Chunk {
                text: "hello".into()
            })
        );
    }

    #[test]
    fn routes_done_with_metadata_to_completion() {
        let mut router = EventRouter::default();
        let event = router.route(&frame("{\"done\":true,\"metadata\":{\"tokens\":42}}"));
        match event {
            Some(ChatEvent::Completion { metadata }) => {
                assert_eq!(metadata.get("tokens"), Some(&Value::from(42)));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn completion_metadata_defaults_to_empty() {
        let mut router = EventRouter::default();
        let event = router.route(&frame("{\"done\":true}"));
        assert_eq!(
            event,
            Some(ChatEvent::Completion {
                metadata: Map::new()
            })
        );
    }

    #[test]
    fn error_takes_precedence_over_other_shapes() {
        let mut router = EventRouter::default();
        let event = router.route(&frame(
            "{\"error\":\"quota exceeded\",\"content\":\"x\",\"done\":true}",
        ));
        assert_eq!(
            event,
            Some(ChatEvent::ServerError {
                message: "quota exceeded".into()
            })
        );
    }

    #[test]
    fn done_takes_precedence_over_content() {
        let mut router = EventRouter::default();
        let event = router.route(&frame("{\"done\":true,\"content\":\"x\"}"));
        assert!(matches!(event, Some(ChatEvent::Completion { .. })));
    }

    #[test]
    fn falsey_done_values_are_not_completions() {
        let mut router = EventRouter::default();
        for payload in [
            "{\"done\":false}",
            "{\"done\":null}",
            "{\"done\":0}",
            "{\"done\":\"\"}",
        ] {
            assert_eq!(router.route(&frame(payload)), None, "payload {payload}");
        }
    }

    #[test]
    fn truthy_non_boolean_done_values_complete() {
        let mut router = EventRouter::default();
        for payload in ["{\"done\":1}", "{\"done\":\"yes\"}"] {
            assert!(
                matches!(
                    router.route(&frame(payload)),
                    Some(ChatEvent::Completion { .. })
                ),
                "payload {payload}"
            );
        }
    }

    #[test]
    fn malformed_payload_is_skipped_and_counted() {
        let mut router = EventRouter::default();
        assert_eq!(router.route(&frame("not-json")), None);
        assert_eq!(router.malformed_frames(), 1);
        let event = router.route(&frame("{\"content\":\"ok\"}"));
        assert_eq!(event, Some(ChatEvent::Chunk { text: "ok".into() }));
    }

    #[test]
    fn unknown_payload_shape_is_ignored() {
        let mut router = EventRouter::default();
        assert_eq!(router.route(&frame("{\"keepalive\":true}")), None);
        assert_eq!(router.malformed_frames(), 0);
    }

    #[test]
    fn non_string_error_is_stringified() {
        let mut router = EventRouter::default();
        let event = router.route(&frame("{\"error\":{\"code\":500}}"));
        assert!(matches!(
            event,
            Some(ChatEvent::ServerError { message }) if message.contains("500")
        ));
    }
}
