pub mod controller;
pub mod display;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::request::RequestStatus;

/// Broadcast to tracking dashboards whenever a request changes status.
/// Polling against the store remains the authoritative read path.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub occurred_at: DateTime<Utc>,
}
