use serde::Serialize;
use utoipa::ToSchema;

/// Storage reachability as seen by `/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// No store installed, or the last probe failed.
    Degraded,
}

/// `{"status": "ok" | "degraded"}`
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl HealthResponse {
    pub fn new(healthy: bool) -> Self {
        let status = if healthy {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };
        Self { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let ok = serde_json::to_value(HealthResponse::new(true)).unwrap();
        assert_eq!(ok["status"], "ok");
        let degraded = serde_json::to_value(HealthResponse::new(false)).unwrap();
        assert_eq!(degraded["status"], "degraded");
    }
}
