use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::{Actor, Role};
use crate::models::booking::Booking;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/bookings", post(register_booking))
}

#[derive(Deserialize)]
pub struct RegisterBookingRequest {
    pub place_name: String,
    pub address: String,
    pub coordinates: GeoPoint,
    pub owner: Uuid,
}

/// Shim for the external booking service: mirrors the destination context a
/// place booking contributes to the dispatch flow.
async fn register_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<RegisterBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if !matches!(actor.role, Role::Owner | Role::Admin) {
        return Err(AppError::Forbidden(
            "only place owners may register bookings".to_string(),
        ));
    }

    if payload.place_name.trim().is_empty() {
        return Err(AppError::BadRequest("place_name cannot be empty".to_string()));
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        place_name: payload.place_name,
        address: payload.address,
        coordinates: payload.coordinates,
        owner: payload.owner,
        registered_at: Utc::now(),
    };

    state.store.insert_booking(booking.clone());
    Ok(Json(booking))
}
