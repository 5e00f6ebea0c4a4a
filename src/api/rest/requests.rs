use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::dispatch::controller::{self, CreateRequest, PhotoUpload};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::{Actor, Role};
use crate::models::request::{Place, RequestStatus, TransportRequest, VehicleType};
use crate::state::AppState;
use crate::tracking::{self, LocationReport, TrackedRequest};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transport-requests", post(create))
        .route("/transport-requests/mine", get(list_mine))
        .route("/transport-requests/driver", get(list_for_driver))
        .route("/transport-requests/owner", get(list_for_owner))
        .route("/transport-requests/all", get(list_all))
        .route("/transport-requests/:id", get(get_request))
        .route("/transport-requests/:id/accept", put(accept))
        .route("/transport-requests/:id/start-enroute", put(start_enroute))
        .route("/transport-requests/:id/mark-arrived", put(mark_arrived))
        .route("/transport-requests/:id/pickup-complete", put(pickup_complete))
        .route(
            "/transport-requests/:id/destination-arrived",
            put(destination_arrived),
        )
        .route("/transport-requests/:id/cancel", put(cancel))
        .route("/transport-requests/:id/location", put(report_location))
}

#[derive(Deserialize)]
pub struct CreateRequestPayload {
    pub vehicle_type: String,
    pub pickup: Place,
    #[serde(default)]
    pub destination: Option<Place>,
    #[serde(default)]
    pub booking_id: Option<Uuid>,
    #[serde(default)]
    pub passengers: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CancelPayload {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct PhotoPayload {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct DestinationArrivedPayload {
    #[serde(default)]
    pub photos: Vec<PhotoPayload>,
    #[serde(default)]
    pub final_fare: Option<u32>,
}

#[derive(Deserialize)]
pub struct LocationPayload {
    pub coordinates: GeoPoint,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub eta_minutes: Option<u32>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<Json<TransportRequest>, AppError> {
    let vehicle_type: VehicleType = payload.vehicle_type.parse()?;

    let request = controller::create_request(
        &state,
        actor,
        CreateRequest {
            vehicle_type,
            pickup: payload.pickup,
            destination: payload.destination,
            booking_id: payload.booking_id,
            passengers: payload.passengers.unwrap_or(1),
            notes: payload.notes,
        },
    )?;

    Ok(Json(request))
}

async fn accept(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportRequest>, AppError> {
    controller::accept(&state, actor, id)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::Accepted, err))
        .map(Json)
}

async fn start_enroute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportRequest>, AppError> {
    controller::start_enroute(&state, actor, id)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::DriverEnroute, err))
        .map(Json)
}

async fn mark_arrived(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportRequest>, AppError> {
    controller::mark_arrived(&state, actor, id)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::Arrived, err))
        .map(Json)
}

async fn pickup_complete(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportRequest>, AppError> {
    controller::pickup_complete(&state, actor, id)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::InProgress, err))
        .map(Json)
}

async fn destination_arrived(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<DestinationArrivedPayload>,
) -> Result<Json<TransportRequest>, AppError> {
    let photos = payload
        .photos
        .into_iter()
        .map(|photo| PhotoUpload {
            url: photo.url,
            label: photo.label,
        })
        .collect();

    controller::destination_arrived(&state, actor, id, photos, payload.final_fare)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::Completed, err))
        .map(Json)
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelPayload>,
) -> Result<Json<TransportRequest>, AppError> {
    controller::cancel(&state, actor, id, payload.reason)
        .or_else(|err| recover_duplicate(&state, actor, id, RequestStatus::Cancelled, err))
        .map(Json)
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationPayload>,
) -> Result<Json<TransportRequest>, AppError> {
    let updated = tracking::report_location(
        &state,
        actor,
        id,
        LocationReport {
            coordinates: payload.coordinates,
            address: payload.address,
            eta_minutes: payload.eta_minutes,
        },
    )?;

    Ok(Json(updated))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackedRequest>, AppError> {
    let request = state.store.get(id)?;

    if !may_view(&state, actor, &request) {
        return Err(AppError::Forbidden(
            "not a participant of this transport request".to_string(),
        ));
    }

    Ok(Json(TrackedRequest::from(request)))
}

async fn list_mine(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Json<Vec<TrackedRequest>> {
    Json(tracking::for_requester(&state, actor.user_id))
}

async fn list_for_driver(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<TrackedRequest>>, AppError> {
    if actor.role != Role::Driver {
        return Err(AppError::Forbidden("driver role required".to_string()));
    }
    Ok(Json(tracking::for_driver(&state, actor.user_id)))
}

async fn list_for_owner(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<TrackedRequest>>, AppError> {
    if actor.role != Role::Owner {
        return Err(AppError::Forbidden("owner role required".to_string()));
    }
    Ok(Json(tracking::for_owner(&state, actor.user_id)))
}

const ADMIN_LIST_LIMIT: usize = 100;

async fn list_all(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<TrackedRequest>>, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden("admin role required".to_string()));
    }

    let mut all = state.store.list(|_| true);
    all.truncate(ADMIN_LIST_LIMIT);
    Ok(Json(all.into_iter().map(TrackedRequest::from).collect()))
}

fn may_view(state: &AppState, actor: Actor, request: &TransportRequest) -> bool {
    if actor.is_admin() || actor.user_id == request.requester {
        return true;
    }
    if actor.role == Role::Driver
        && (request.driver == Some(actor.user_id) || request.status == RequestStatus::Pending)
    {
        return true;
    }
    if actor.role == Role::Owner {
        if let Some(booking_id) = request.booking {
            return state
                .store
                .booking(booking_id)
                .is_some_and(|booking| booking.owner == actor.user_id);
        }
    }
    false
}

/// Polling clients retry: a transition that already landed comes back as a
/// conflict from the controller, but answers 200 with the current record
/// when the record is already in the action's target state and the caller
/// is a legitimate participant.
fn recover_duplicate(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    target: RequestStatus,
    err: AppError,
) -> Result<TransportRequest, AppError> {
    if !matches!(
        err,
        AppError::InvalidTransition { .. } | AppError::AlreadyAccepted
    ) {
        return Err(err);
    }

    let current = state.store.get(id)?;
    if current.status != target {
        return Err(err);
    }

    let benign = match target {
        RequestStatus::Cancelled => {
            actor.is_admin()
                || actor.user_id == current.requester
                || current.driver == Some(actor.user_id)
        }
        _ => current.driver == Some(actor.user_id),
    };

    if benign {
        Ok(current)
    } else {
        Err(err)
    }
}
