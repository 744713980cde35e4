use std::time::SystemTime;

use tracing::info;

use crate::{
    dto::{
        format_system_time,
        ticker::{TickerMessage, TickerRequest},
    },
    services::events,
    state::SharedState,
};

const DEFAULT_DURATION_SECS: u32 = 5;

/// Broadcast a ticker message to every display.
pub fn send(state: &SharedState, request: TickerRequest) -> TickerMessage {
    let message = TickerMessage {
        message: request.message,
        duration: request.duration.unwrap_or(DEFAULT_DURATION_SECS),
        sent_at: format_system_time(SystemTime::now()),
    };
    info!(duration = message.duration, "ticker message sent");
    events::broadcast_ticker(state, &message);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn duration_defaults_to_five_seconds() {
        let state = AppState::new(AppConfig::default(), None);
        let mut hub = state.hub().subscribe();
        let sent = send(
            &state,
            TickerRequest {
                message: "Finals start at 8pm".into(),
                duration: None,
            },
        );
        assert_eq!(sent.duration, 5);
        let event = hub.recv().await.unwrap();
        assert_eq!(event.name, events::TICKER_MESSAGE);
        assert_eq!(event.room, None);
    }
}
