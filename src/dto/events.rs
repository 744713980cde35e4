//! Payloads exchanged over the `/ws` socket.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Frame sent by clients: `{"event": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Data of `subscribe` / `unsubscribe`, echoed back as the ack.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub tournament_id: u64,
}

/// Data of `display:register`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRegister {
    /// Kind of display (`match`, `bracket`, `flyer`, ...).
    pub display_type: String,
    /// Stable id of the display; generated when missing.
    pub display_id: Option<String>,
}

/// Data of `display:registered` and `display:disconnected`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEvent {
    pub display_id: String,
    pub display_type: String,
}

/// Data of `pong`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Pong {
    pub timestamp: String,
}

/// Data of `error`, sent when a client frame cannot be handled.
#[derive(Debug, Serialize, ToSchema)]
pub struct SocketError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_without_data_parse() {
        let frame: ClientFrame = serde_json::from_str(r#"{"event": "matches:request"}"#).unwrap();
        assert_eq!(frame.event, "matches:request");
        assert!(frame.data.is_null());

        let frame: ClientFrame =
            serde_json::from_str(r#"{"event": "display:register", "data": {"displayType": "match"}}"#)
                .unwrap();
        let register: DisplayRegister = serde_json::from_value(frame.data).unwrap();
        assert_eq!(register.display_type, "match");
        assert_eq!(register.display_id, None);
    }
}
