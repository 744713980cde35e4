use std::time::SystemTime;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use utoipa::ToSchema;

pub mod bracket;
pub mod events;
pub mod flyer;
pub mod health;
pub mod matches;
pub mod participant;
pub mod station;
pub mod status;
pub mod ticker;
pub mod tournament;
pub mod validation;

/// Successful response envelope: `{"success": true, ...data}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Success<T> {
    /// Always `true`.
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

pub(crate) fn format_optional_time(time: Option<SystemTime>) -> Option<String> {
    time.map(format_system_time)
}
