use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::dispatch::display::{self, StatusDisplay};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::{Actor, Role};
use crate::models::request::{
    DriverLocation, Eta, RequestStatus, TransportRequest,
};
use crate::state::AppState;

/// Read-side projection handed to polling clients: the request plus the
/// display metadata every screen derives its badges from.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedRequest {
    #[serde(flatten)]
    pub request: TransportRequest,
    pub status_display: StatusDisplay,
}

impl From<TransportRequest> for TrackedRequest {
    fn from(request: TransportRequest) -> Self {
        let status_display = display::for_status(request.status);
        Self {
            request,
            status_display,
        }
    }
}

#[derive(Debug)]
pub struct LocationReport {
    pub coordinates: GeoPoint,
    pub address: Option<String>,
    /// Externally supplied advisory ETA; this service never computes one.
    pub eta_minutes: Option<u32>,
}

/// Last-write-wins overwrite of the driver's position; no path history is
/// kept. Valid only while the assigned driver is actually moving.
pub fn report_location(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    report: LocationReport,
) -> Result<TransportRequest, AppError> {
    // Identity check first; the driver reference is set at most once, so a
    // passing check cannot be invalidated by a concurrent transition.
    let current = state.store.get(id)?;
    if actor.role != Role::Driver || current.driver != Some(actor.user_id) {
        state
            .metrics
            .location_updates_total
            .with_label_values(&["rejected"])
            .inc();
        return Err(AppError::Forbidden(
            "only the assigned driver may report location".to_string(),
        ));
    }

    let reportable = [RequestStatus::DriverEnroute, RequestStatus::InProgress];
    let result = state.store.update_if(id, &reportable, |request| {
        let now = Utc::now();
        request.driver_location = Some(DriverLocation {
            coordinates: report.coordinates,
            address: report.address.clone(),
            last_updated: now,
        });
        if let Some(minutes) = report.eta_minutes {
            request.eta = Some(Eta {
                minutes,
                last_calculated: now,
            });
        }
    });

    let outcome = if result.is_ok() { "success" } else { "rejected" };
    state
        .metrics
        .location_updates_total
        .with_label_values(&[outcome])
        .inc();

    if let Ok(updated) = &result {
        debug!(request_id = %updated.id, "driver location updated");
    }

    result
}

/// Everything the visitor has requested, newest first.
pub fn for_requester(state: &AppState, user_id: Uuid) -> Vec<TrackedRequest> {
    state
        .store
        .list(|request| request.requester == user_id)
        .into_iter()
        .map(TrackedRequest::from)
        .collect()
}

/// The driver's own trips plus the open pending pool they poll for work.
pub fn for_driver(state: &AppState, driver_id: Uuid) -> Vec<TrackedRequest> {
    state
        .store
        .list(|request| {
            request.driver == Some(driver_id) || request.status == RequestStatus::Pending
        })
        .into_iter()
        .map(TrackedRequest::from)
        .collect()
}

/// Requests whose booking points at one of the owner's places.
pub fn for_owner(state: &AppState, owner_id: Uuid) -> Vec<TrackedRequest> {
    state
        .store
        .list(|request| match request.booking {
            Some(booking_id) => state
                .store
                .booking(booking_id)
                .is_some_and(|booking| booking.owner == owner_id),
            None => false,
        })
        .into_iter()
        .map(TrackedRequest::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{for_driver, for_requester, report_location, LocationReport};
    use crate::dispatch::controller::{accept, create_request, start_enroute, CreateRequest};
    use crate::error::AppError;
    use crate::geo::GeoPoint;
    use crate::models::actor::{Actor, Role};
    use crate::models::request::{Place, VehicleType};
    use crate::state::AppState;

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn create(state: &AppState, rider: Actor) -> Uuid {
        create_request(
            state,
            rider,
            CreateRequest {
                vehicle_type: VehicleType::Motorcycle,
                pickup: Place {
                    address: "pier".to_string(),
                    coordinates: GeoPoint { lat: 9.74, lng: 118.73 },
                    place_name: None,
                },
                destination: Some(Place {
                    address: "plaza".to_string(),
                    coordinates: GeoPoint { lat: 9.78, lng: 118.74 },
                    place_name: None,
                }),
                booking_id: None,
                passengers: 1,
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    fn report() -> LocationReport {
        LocationReport {
            coordinates: GeoPoint { lat: 9.75, lng: 118.735 },
            address: None,
            eta_minutes: Some(7),
        }
    }

    #[test]
    fn location_report_while_pending_is_forbidden() {
        let state = AppState::new(16);
        let id = create(&state, actor(Role::Visitor));

        let err = report_location(&state, actor(Role::Driver), id, report()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn location_report_overwrites_previous_position() {
        let state = AppState::new(16);
        let id = create(&state, actor(Role::Visitor));
        let cabbie = actor(Role::Driver);

        accept(&state, cabbie, id).unwrap();
        start_enroute(&state, cabbie, id).unwrap();

        report_location(&state, cabbie, id, report()).unwrap();
        let second = LocationReport {
            coordinates: GeoPoint { lat: 9.76, lng: 118.74 },
            address: Some("near the market".to_string()),
            eta_minutes: Some(4),
        };
        let updated = report_location(&state, cabbie, id, second).unwrap();

        let location = updated.driver_location.unwrap();
        assert!((location.coordinates.lat - 9.76).abs() < 1e-9);
        assert_eq!(location.address.as_deref(), Some("near the market"));
        assert_eq!(updated.eta.unwrap().minutes, 4);
    }

    #[test]
    fn location_report_outside_active_leg_is_stale() {
        let state = AppState::new(16);
        let id = create(&state, actor(Role::Visitor));
        let cabbie = actor(Role::Driver);

        accept(&state, cabbie, id).unwrap();
        let err = report_location(&state, cabbie, id, report()).unwrap_err();
        assert!(matches!(err, AppError::StaleState { .. }));
    }

    #[test]
    fn driver_feed_includes_open_pool_and_own_trips() {
        let state = AppState::new(16);
        let rider = actor(Role::Visitor);
        let cabbie = actor(Role::Driver);

        let mine = create(&state, rider);
        let open = create(&state, actor(Role::Visitor));
        accept(&state, cabbie, mine).unwrap();

        let feed = for_driver(&state, cabbie.user_id);
        let ids: Vec<Uuid> = feed.iter().map(|t| t.request.id).collect();
        assert!(ids.contains(&mine));
        assert!(ids.contains(&open));

        let rider_view = for_requester(&state, rider.user_id);
        assert_eq!(rider_view.len(), 1);
        assert_eq!(rider_view[0].request.id, mine);
    }
}
