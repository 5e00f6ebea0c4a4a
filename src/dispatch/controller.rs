use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::RequestEvent;
use crate::error::AppError;
use crate::fare;
use crate::geo;
use crate::models::actor::{Actor, Role};
use crate::models::request::{
    CancelActor, Fare, Place, RequestStatus, Timeline, TransportRequest, TripDuration, TripPhoto,
    VehicleType,
};
use crate::state::AppState;

const DEFAULT_CANCEL_REASON: &str = "cancelled without a stated reason";
const DEFAULT_PHOTO_LABEL: &str = "destination_arrival";

#[derive(Debug)]
pub struct CreateRequest {
    pub vehicle_type: VehicleType,
    pub pickup: Place,
    pub destination: Option<Place>,
    pub booking_id: Option<Uuid>,
    pub passengers: u8,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub url: String,
    pub label: Option<String>,
}

/// Builds and stores a new pending request. Destination falls back to the
/// booked place when the rider does not spell one out.
pub fn create_request(
    state: &AppState,
    actor: Actor,
    input: CreateRequest,
) -> Result<TransportRequest, AppError> {
    if actor.role != Role::Visitor {
        return Err(AppError::Forbidden(
            "only visitors may request transport".to_string(),
        ));
    }

    let booking = match input.booking_id {
        Some(booking_id) => Some(
            state
                .store
                .booking(booking_id)
                .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?,
        ),
        None => None,
    };

    let destination = match (input.destination, &booking) {
        (Some(destination), _) => destination,
        (None, Some(booking)) => Place {
            address: booking.address.clone(),
            coordinates: booking.coordinates,
            place_name: Some(booking.place_name.clone()),
        },
        (None, None) => {
            return Err(AppError::BadRequest(
                "destination or booking_id is required".to_string(),
            ));
        }
    };

    let distance_km =
        geo::road_distance_km(&input.pickup.coordinates, &destination.coordinates);
    let quote = fare::estimate(input.vehicle_type, distance_km);

    let now = Utc::now();
    let request = TransportRequest {
        id: Uuid::new_v4(),
        status: RequestStatus::Pending,
        requester: actor.user_id,
        driver: None,
        booking: booking.as_ref().map(|b| b.id),
        vehicle_type: input.vehicle_type,
        pickup: input.pickup,
        destination,
        distance_km,
        fare: Fare::estimated(quote.fare),
        duration: TripDuration {
            estimated: Some(quote.minutes),
            actual: None,
        },
        eta: None,
        driver_location: None,
        timeline: Timeline::starting_at(now),
        photos: Vec::new(),
        passengers: input.passengers,
        notes: input.notes,
        cancel_reason: None,
        cancelled_by: None,
        created_at: now,
    };

    let created = state.store.create(request)?;
    state.metrics.active_requests.inc();
    emit(state, &created);

    info!(
        request_id = %created.id,
        vehicle_type = %created.vehicle_type,
        fare = created.fare.estimated,
        "transport request created"
    );

    Ok(created)
}

/// `pending -> accepted`. First driver wins; the driver reference is set
/// exactly once and never reassigned.
pub fn accept(state: &AppState, actor: Actor, id: Uuid) -> Result<TransportRequest, AppError> {
    if actor.role != Role::Driver {
        return Err(AppError::Forbidden(
            "only drivers may accept transport requests".to_string(),
        ));
    }

    let result = state.store.update(id, |current| {
        if current.status != RequestStatus::Pending {
            // A dead request is not a lost race; only a live one that
            // another driver holds reports AlreadyAccepted.
            if !current.status.is_terminal() && current.driver.is_some() {
                return Err(AppError::AlreadyAccepted);
            }
            return Err(invalid("accept", current));
        }

        let mut next = current.clone();
        next.status = RequestStatus::Accepted;
        next.driver = Some(actor.user_id);
        next.timeline.accepted = Some(Utc::now());
        Ok(next)
    });

    finish(state, "accept", result)
}

/// `accepted -> driver_enroute`, assigned driver only.
pub fn start_enroute(
    state: &AppState,
    actor: Actor,
    id: Uuid,
) -> Result<TransportRequest, AppError> {
    let result = state.store.update(id, |current| {
        require_assigned_driver(actor, current)?;
        if current.status != RequestStatus::Accepted {
            return Err(invalid("start_enroute", current));
        }

        let mut next = current.clone();
        next.status = RequestStatus::DriverEnroute;
        next.timeline.driver_enroute = Some(Utc::now());
        Ok(next)
    });

    finish(state, "start_enroute", result)
}

/// `driver_enroute -> arrived`, assigned driver only.
pub fn mark_arrived(state: &AppState, actor: Actor, id: Uuid) -> Result<TransportRequest, AppError> {
    let result = state.store.update(id, |current| {
        require_assigned_driver(actor, current)?;
        if current.status != RequestStatus::DriverEnroute {
            return Err(invalid("mark_arrived", current));
        }

        let mut next = current.clone();
        next.status = RequestStatus::Arrived;
        next.timeline.arrived_at_pickup = Some(Utc::now());
        Ok(next)
    });

    finish(state, "mark_arrived", result)
}

/// `arrived -> in_progress`: passenger on board, trip clock starts.
pub fn pickup_complete(
    state: &AppState,
    actor: Actor,
    id: Uuid,
) -> Result<TransportRequest, AppError> {
    let result = state.store.update(id, |current| {
        require_assigned_driver(actor, current)?;
        if current.status != RequestStatus::Arrived {
            return Err(invalid("pickup_complete", current));
        }

        let mut next = current.clone();
        next.status = RequestStatus::InProgress;
        next.timeline.started = Some(Utc::now());
        Ok(next)
    });

    finish(state, "pickup_complete", result)
}

/// `in_progress -> completed`. Requires proof-of-arrival photos, settles the
/// final fare and the actual trip duration.
pub fn destination_arrived(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    photos: Vec<PhotoUpload>,
    final_fare: Option<u32>,
) -> Result<TransportRequest, AppError> {
    let result = state.store.update(id, |current| {
        require_assigned_driver(actor, current)?;
        if current.status != RequestStatus::InProgress {
            return Err(invalid("destination_arrived", current));
        }
        if photos.is_empty() {
            return Err(AppError::MissingPhoto);
        }

        let now = Utc::now();
        let mut next = current.clone();
        next.status = RequestStatus::Completed;
        next.timeline.completed = Some(now);
        next.fare.r#final = Some(final_fare.unwrap_or(current.fare.estimated));

        if let Some(started) = current.timeline.started {
            let minutes = (now - started).num_minutes().max(0) as u32;
            next.duration.actual = Some(minutes);
        }

        next.photos.extend(photos.iter().map(|photo| TripPhoto {
            url: photo.url.clone(),
            label: photo
                .label
                .clone()
                .unwrap_or_else(|| DEFAULT_PHOTO_LABEL.to_string()),
            uploaded_at: now,
        }));

        Ok(next)
    });

    if let Ok(completed) = &result {
        if let Some(minutes) = completed.duration.actual {
            state
                .metrics
                .trip_duration_minutes
                .observe(f64::from(minutes));
        }
    }

    finish(state, "destination_arrived", result)
}

/// Reachable from every non-terminal state, by the requester, the assigned
/// driver, or an admin.
pub fn cancel(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    reason: Option<String>,
) -> Result<TransportRequest, AppError> {
    let result = state.store.update(id, |current| {
        let cancelled_by = cancel_actor(actor, current)?;
        if current.status.is_terminal() {
            return Err(invalid("cancel", current));
        }

        let mut next = current.clone();
        next.status = RequestStatus::Cancelled;
        next.timeline.cancelled = Some(Utc::now());
        next.cancel_reason =
            Some(reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string()));
        next.cancelled_by = Some(cancelled_by);
        Ok(next)
    });

    finish(state, "cancel", result)
}

fn invalid(action: &'static str, current: &TransportRequest) -> AppError {
    AppError::InvalidTransition {
        action,
        current: current.status.to_string(),
    }
}

fn require_assigned_driver(actor: Actor, current: &TransportRequest) -> Result<(), AppError> {
    if actor.role != Role::Driver || current.driver != Some(actor.user_id) {
        return Err(AppError::Forbidden(
            "only the assigned driver may perform this action".to_string(),
        ));
    }
    Ok(())
}

fn cancel_actor(actor: Actor, current: &TransportRequest) -> Result<CancelActor, AppError> {
    if actor.is_admin() {
        return Ok(CancelActor::Admin);
    }
    if actor.user_id == current.requester {
        return Ok(CancelActor::Visitor);
    }
    if current.driver == Some(actor.user_id) {
        return Ok(CancelActor::Driver);
    }

    Err(AppError::Forbidden(
        "only the requester, the assigned driver, or an admin may cancel".to_string(),
    ))
}

/// Post-commit bookkeeping shared by every transition: metrics, booking
/// release on terminal states, and the broadcast event.
fn finish(
    state: &AppState,
    action: &'static str,
    result: Result<TransportRequest, AppError>,
) -> Result<TransportRequest, AppError> {
    match result {
        Ok(updated) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action, "success"])
                .inc();

            if updated.status.is_terminal() {
                state.metrics.active_requests.dec();
                if let Some(booking_id) = updated.booking {
                    state.store.release_booking(booking_id, updated.id);
                }
            }

            emit(state, &updated);

            info!(
                request_id = %updated.id,
                status = %updated.status,
                action,
                "transition applied"
            );

            Ok(updated)
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action, "rejected"])
                .inc();
            Err(err)
        }
    }
}

fn emit(state: &AppState, request: &TransportRequest) {
    let _ = state.events_tx.send(RequestEvent {
        request_id: request.id,
        status: request.status,
        occurred_at: Utc::now(),
    });
}
