use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::Booking;
use crate::models::request::{RequestStatus, TransportRequest};

/// Canonical state of every transport request, plus the booking context the
/// linkage cuts across. All mutation goes through [`update`](Self::update) /
/// [`update_if`](Self::update_if), which hold the one request's exclusive
/// map entry for the whole read-modify-write.
pub struct RequestStore {
    requests: DashMap<Uuid, TransportRequest>,
    bookings: DashMap<Uuid, Booking>,
    // Claim map enforcing at most one live request per booking. Claimed
    // atomically at create, released when the request goes terminal.
    active_by_booking: DashMap<Uuid, Uuid>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            bookings: DashMap::new(),
            active_by_booking: DashMap::new(),
        }
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|entry| entry.value().clone())
    }

    /// Inserts a freshly built request, claiming its booking slot first.
    pub fn create(&self, request: TransportRequest) -> Result<TransportRequest, AppError> {
        if let Some(booking_id) = request.booking {
            match self.active_by_booking.entry(booking_id) {
                Entry::Occupied(_) => return Err(AppError::DuplicateActiveRequest),
                Entry::Vacant(slot) => {
                    slot.insert(request.id);
                }
            }
        }

        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    pub fn get(&self, id: Uuid) -> Result<TransportRequest, AppError> {
        self.requests
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("transport request {id} not found")))
    }

    /// Atomic read-modify-write. The closure builds the replacement record
    /// from the current one; if it fails, the stored record is untouched.
    pub fn update<F>(&self, id: Uuid, apply: F) -> Result<TransportRequest, AppError>
    where
        F: FnOnce(&TransportRequest) -> Result<TransportRequest, AppError>,
    {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("transport request {id} not found")))?;

        let updated = apply(entry.value())?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    /// Conditional write: applies the mutation only while the current status
    /// is in the expected set, otherwise the writer lost a race and gets
    /// `StaleState`.
    pub fn update_if<F>(
        &self,
        id: Uuid,
        expected: &[RequestStatus],
        mutate: F,
    ) -> Result<TransportRequest, AppError>
    where
        F: FnOnce(&mut TransportRequest),
    {
        self.update(id, |current| {
            if !expected.contains(&current.status) {
                return Err(AppError::StaleState {
                    expected: expected
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("|"),
                    current: current.status.to_string(),
                });
            }

            let mut next = current.clone();
            mutate(&mut next);
            Ok(next)
        })
    }

    /// Releases the one-live-request-per-booking claim, but only if it is
    /// still held by the given request.
    pub fn release_booking(&self, booking_id: Uuid, request_id: Uuid) {
        self.active_by_booking
            .remove_if(&booking_id, |_, held_by| *held_by == request_id);
    }

    pub fn list<F>(&self, predicate: F) -> Vec<TransportRequest>
    where
        F: Fn(&TransportRequest) -> bool,
    {
        let mut matches: Vec<TransportRequest> = self
            .requests
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn active_request_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .count()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::RequestStore;
    use crate::error::AppError;
    use crate::geo::GeoPoint;
    use crate::models::request::{
        Fare, Place, RequestStatus, Timeline, TransportRequest, TripDuration, VehicleType,
    };

    fn place(lat: f64, lng: f64) -> Place {
        Place {
            address: "somewhere".to_string(),
            coordinates: GeoPoint { lat, lng },
            place_name: None,
        }
    }

    fn request(booking: Option<Uuid>) -> TransportRequest {
        let now = Utc::now();
        TransportRequest {
            id: Uuid::new_v4(),
            status: RequestStatus::Pending,
            requester: Uuid::new_v4(),
            driver: None,
            booking,
            vehicle_type: VehicleType::Tricycle,
            pickup: place(9.74, 118.73),
            destination: place(9.80, 118.75),
            distance_km: 5.0,
            fare: Fare::estimated(90),
            duration: TripDuration {
                estimated: Some(10),
                actual: None,
            },
            eta: None,
            driver_location: None,
            timeline: Timeline::starting_at(now),
            photos: Vec::new(),
            passengers: 1,
            notes: None,
            cancel_reason: None,
            cancelled_by: None,
            created_at: now,
        }
    }

    #[test]
    fn second_request_for_same_booking_is_rejected() {
        let store = RequestStore::new();
        let booking_id = Uuid::new_v4();

        store.create(request(Some(booking_id))).unwrap();
        let err = store.create(request(Some(booking_id))).unwrap_err();
        assert!(matches!(err, AppError::DuplicateActiveRequest));
    }

    #[test]
    fn booking_slot_reopens_after_release() {
        let store = RequestStore::new();
        let booking_id = Uuid::new_v4();

        let first = store.create(request(Some(booking_id))).unwrap();
        store.release_booking(booking_id, first.id);

        assert!(store.create(request(Some(booking_id))).is_ok());
    }

    #[test]
    fn release_by_non_holder_keeps_claim() {
        let store = RequestStore::new();
        let booking_id = Uuid::new_v4();

        store.create(request(Some(booking_id))).unwrap();
        store.release_booking(booking_id, Uuid::new_v4());

        let err = store.create(request(Some(booking_id))).unwrap_err();
        assert!(matches!(err, AppError::DuplicateActiveRequest));
    }

    #[test]
    fn failed_update_leaves_record_unchanged() {
        let store = RequestStore::new();
        let created = store.create(request(None)).unwrap();

        let err = store
            .update(created.id, |_current| {
                Err::<TransportRequest, _>(AppError::MissingPhoto)
            })
            .unwrap_err();
        assert!(matches!(err, AppError::MissingPhoto));

        let stored = store.get(created.id).unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[test]
    fn update_if_rejects_unexpected_status() {
        let store = RequestStore::new();
        let created = store.create(request(None)).unwrap();

        let err = store
            .update_if(created.id, &[RequestStatus::InProgress], |req| {
                req.notes = Some("should not land".to_string());
            })
            .unwrap_err();
        assert!(matches!(err, AppError::StaleState { .. }));

        assert!(store.get(created.id).unwrap().notes.is_none());
    }
}
