use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Tricycle,
    Motorcycle,
    Car,
    Van,
}

impl FromStr for VehicleType {
    type Err = AppError;

    // Accepts the legacy aliases still sent by older clients.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "tricycle" => Ok(VehicleType::Tricycle),
            "motorcycle" => Ok(VehicleType::Motorcycle),
            "car" | "private_car" => Ok(VehicleType::Car),
            "van" => Ok(VehicleType::Van),
            other => Err(AppError::InvalidVehicleType(other.to_string())),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VehicleType::Tricycle => "tricycle",
            VehicleType::Motorcycle => "motorcycle",
            VehicleType::Car => "car",
            VehicleType::Van => "van",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    DriverEnroute,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::DriverEnroute => "driver_enroute",
            RequestStatus::Arrived => "arrived",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A pickup or destination endpoint of the trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub coordinates: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fare {
    pub estimated: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#final: Option<u32>,
    pub currency: String,
}

impl Fare {
    pub fn estimated(amount: u32) -> Self {
        Self {
            estimated: amount,
            r#final: None,
            currency: "PHP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripDuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<u32>,
}

/// Advisory estimate supplied by the reporting layer; never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eta {
    pub minutes: u32,
    pub last_calculated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverLocation {
    pub coordinates: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPhoto {
    pub url: String,
    pub label: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelActor {
    Visitor,
    Driver,
    Admin,
}

/// Milestone timestamps, stamped exactly once at the matching transition
/// and never rewritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub requested: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_enroute: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at_pickup: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn starting_at(requested: DateTime<Utc>) -> Self {
        Self {
            requested,
            accepted: None,
            driver_enroute: None,
            arrived_at_pickup: None,
            started: None,
            completed: None,
            cancelled: None,
        }
    }
}

/// The aggregate root of one ride-dispatch lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRequest {
    pub id: Uuid,
    pub status: RequestStatus,
    pub requester: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<Uuid>,
    pub vehicle_type: VehicleType,
    pub pickup: Place,
    pub destination: Place,
    pub distance_km: f64,
    pub fare: Fare,
    pub duration: TripDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<Eta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_location: Option<DriverLocation>,
    pub timeline: Timeline,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<TripPhoto>,
    pub passengers: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelActor>,
    pub created_at: DateTime<Utc>,
}
