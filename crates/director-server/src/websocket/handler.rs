//! Inbound realtime message dispatch.
//!
//! Every inbound text frame produces exactly one reply event for the sender:
//!
//! | Inbound | Reply |
//! |---|---|
//! | `{"type":"ping"}` | `pong` |
//! | `{"type":"get-state"}` | `state` with the current snapshot |
//! | any other JSON | `echo` carrying the parsed payload |
//! | not JSON | `error` |

use director_core::{Event, StateStore};
use serde_json::Value;
use tracing::{debug, warn};

/// Build the reply for one inbound text frame.
pub fn handle_inbound(message: &str, state: &StateStore) -> Event {
    let value: Value = match serde_json::from_str(message) {
        Ok(v) => v,
        Err(e) => {
            warn!(len = message.len(), "invalid JSON received");
            return Event::error(format!("Invalid JSON: {e}"));
        }
    };

    let kind = value.get("type").and_then(Value::as_str);
    debug!(kind, "inbound message");
    match kind {
        Some("ping") => Event::Pong {},
        Some("get-state") => Event::State { state: state.get() },
        _ => Event::Echo { data: value },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_gets_pong() {
        let reply = handle_inbound(r#"{"type":"ping"}"#, &StateStore::new());
        assert_eq!(reply, Event::Pong {});
    }

    #[test]
    fn get_state_returns_snapshot() {
        let store = StateStore::new();
        store.set_monitoring(true);
        match handle_inbound(r#"{"type":"get-state"}"#, &store) {
            Event::State { state } => assert!(state.monitoring_active),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn other_json_is_echoed() {
        let reply = handle_inbound(r#"{"hello":"world","n":1}"#, &StateStore::new());
        assert_eq!(
            reply,
            Event::Echo {
                data: json!({"hello": "world", "n": 1})
            }
        );
    }

    #[test]
    fn non_object_json_is_echoed() {
        let reply = handle_inbound("[1,2,3]", &StateStore::new());
        assert_eq!(reply, Event::Echo { data: json!([1, 2, 3]) });
    }

    #[test]
    fn malformed_json_is_an_error_event() {
        match handle_inbound("{not json", &StateStore::new()) {
            Event::Error { message } => assert!(message.starts_with("Invalid JSON")),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_echoed() {
        let reply = handle_inbound(r#"{"type":"subscribe"}"#, &StateStore::new());
        assert_eq!(reply.kind(), "echo");
    }
}
