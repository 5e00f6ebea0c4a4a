use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Destination context from the place-booking side of the platform.
/// Bookings are owned by the (external) booking service; only the fields
/// the dispatch flow reads are mirrored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub place_name: String,
    pub address: String,
    pub coordinates: GeoPoint,
    pub owner: Uuid,
    pub registered_at: DateTime<Utc>,
}
