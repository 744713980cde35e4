use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

/// Event fanned out to every connected socket.
///
/// The frame is serialized once when broadcast; sockets only filter on `room`.
#[derive(Debug, Clone)]
pub struct HubEvent {
    /// Tournament room the event belongs to, `None` for global events.
    pub room: Option<u64>,
    /// Event name from the catalog, kept for logging.
    pub name: &'static str,
    /// JSON text frame `{"event": name, "data": payload}`.
    pub frame: Arc<str>,
}

#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize a socket frame.
pub fn encode_frame<T: Serialize>(event: &str, data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Frame { event, data })
}

/// Bounded broadcast channel shared by all WebSocket connections.
pub struct EventHub {
    sender: broadcast::Sender<HubEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn publish<T: Serialize>(&self, room: Option<u64>, name: &'static str, data: &T) {
        match encode_frame(name, data) {
            Ok(frame) => {
                let _ = self.sender.send(HubEvent {
                    room,
                    name,
                    frame: frame.into(),
                });
            }
            Err(err) => warn!(event = name, error = %err, "failed to encode event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_encoded_frames() {
        let hub = EventHub::new(4);
        let mut rx = hub.subscribe();
        hub.publish(Some(7), "match:updated", &json!({"id": 3}));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.room, Some(7));
        let frame: Value = serde_json::from_str(&event.frame).unwrap();
        assert_eq!(frame, json!({"event": "match:updated", "data": {"id": 3}}));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = EventHub::new(1);
        let mut rx = hub.subscribe();
        hub.publish(None, "ticker:message", &"a");
        hub.publish(None, "ticker:message", &"b");
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
