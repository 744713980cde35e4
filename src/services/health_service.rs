use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the store and report `degraded` when it is missing or failing.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let healthy = match state.require_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    HealthResponse::new(healthy && !state.is_degraded())
}
