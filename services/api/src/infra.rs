use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use placement_desk::workflows::withdrawals::{
    ActingUser, Application, ApplicationStatus, ApplicationWithdrawalPolicy, Booking,
    BookingStatus, CascadeFailure, CascadeFailureSink, CollaboratorOutcome, DirectoryError,
    EntityId, MatchRequest, MatchRequestStatus, PlacementRequest, PlacementRequestStatus,
    WithdrawalCollaborators, WithdrawalDirectory, WithdrawalReason,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct PlacementStore {
    applications: HashMap<EntityId, Application>,
    placement_requests: HashMap<EntityId, PlacementRequest>,
    match_requests: HashMap<EntityId, MatchRequest>,
    bookings: HashMap<EntityId, Booking>,
}

/// One in-memory store serving as directory, per-kind withdraw
/// collaborators, and application withdrawal policy. The single mutex keeps
/// every operation serial, standing in for the transaction-scoped lock a
/// persistent deployment takes on the root record.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPlacements {
    store: Arc<Mutex<PlacementStore>>,
}

impl InMemoryPlacements {
    pub(crate) fn add_application(&self, application: Application) {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        store
            .applications
            .insert(application.id.clone(), application);
    }

    pub(crate) fn add_placement_request(&self, request: PlacementRequest) {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        store.placement_requests.insert(request.id.clone(), request);
    }

    pub(crate) fn add_match_request(&self, request: MatchRequest) {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        store.match_requests.insert(request.id.clone(), request);
    }

    pub(crate) fn add_booking(&self, booking: Booking) {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        store.bookings.insert(booking.id.clone(), booking);
    }

    pub(crate) fn application_status(&self, id: &EntityId) -> Option<ApplicationStatus> {
        let store = self.store.lock().expect("placement mutex poisoned");
        store.applications.get(id).map(|record| record.status)
    }

    pub(crate) fn placement_request_status(
        &self,
        id: &EntityId,
    ) -> Option<PlacementRequestStatus> {
        let store = self.store.lock().expect("placement mutex poisoned");
        store.placement_requests.get(id).map(|record| record.status)
    }

    pub(crate) fn match_request_status(&self, id: &EntityId) -> Option<MatchRequestStatus> {
        let store = self.store.lock().expect("placement mutex poisoned");
        store.match_requests.get(id).map(|record| record.status)
    }

    pub(crate) fn booking_status(&self, id: &EntityId) -> Option<BookingStatus> {
        let store = self.store.lock().expect("placement mutex poisoned");
        store.bookings.get(id).map(|record| record.status)
    }
}

impl WithdrawalDirectory for InMemoryPlacements {
    fn application(&self, id: &EntityId) -> Result<Option<Application>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store.applications.get(id).cloned())
    }

    fn placement_request(
        &self,
        id: &EntityId,
    ) -> Result<Option<PlacementRequest>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store.placement_requests.get(id).cloned())
    }

    fn match_request(&self, id: &EntityId) -> Result<Option<MatchRequest>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store.match_requests.get(id).cloned())
    }

    fn booking(&self, id: &EntityId) -> Result<Option<Booking>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store.bookings.get(id).cloned())
    }

    fn placement_requests_for_application(
        &self,
        application_id: &EntityId,
    ) -> Result<Vec<PlacementRequest>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        let mut requests: Vec<PlacementRequest> = store
            .placement_requests
            .values()
            .filter(|request| &request.application_id == application_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(requests)
    }

    fn match_request_for_placement_request(
        &self,
        placement_request_id: &EntityId,
    ) -> Result<Option<MatchRequest>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store
            .match_requests
            .values()
            .find(|request| request.placement_request_id.as_ref() == Some(placement_request_id))
            .cloned())
    }

    fn implicit_match_request(
        &self,
        application_id: &EntityId,
    ) -> Result<Option<MatchRequest>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        Ok(store
            .match_requests
            .values()
            .find(|request| {
                &request.application_id == application_id
                    && request.placement_request_id.is_none()
            })
            .cloned())
    }

    fn bookings_for_match_request(
        &self,
        match_request_id: &EntityId,
    ) -> Result<Vec<Booking>, DirectoryError> {
        let store = self.store.lock().expect("placement mutex poisoned");
        let mut bookings: Vec<Booking> = store
            .bookings
            .values()
            .filter(|booking| &booking.match_request_id == match_request_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(bookings)
    }
}

impl WithdrawalCollaborators for InMemoryPlacements {
    fn withdraw_application(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        _reason: WithdrawalReason,
        _other_reason: Option<&str>,
    ) -> CollaboratorOutcome {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        match store.applications.get_mut(id) {
            None => CollaboratorOutcome::NotFound,
            Some(application) => {
                application.status = ApplicationStatus::Withdrawn;
                CollaboratorOutcome::Success
            }
        }
    }

    fn withdraw_placement_request(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        _reason: WithdrawalReason,
    ) -> CollaboratorOutcome {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        match store.placement_requests.get_mut(id) {
            None => CollaboratorOutcome::NotFound,
            Some(request) => {
                request.status = PlacementRequestStatus::Withdrawn;
                CollaboratorOutcome::Success
            }
        }
    }

    fn withdraw_match_request(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        _reason: WithdrawalReason,
    ) -> CollaboratorOutcome {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        match store.match_requests.get_mut(id) {
            None => CollaboratorOutcome::NotFound,
            Some(request) => {
                request.status = MatchRequestStatus::Withdrawn;
                CollaboratorOutcome::Success
            }
        }
    }

    fn withdraw_booking(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        _occurred_at: NaiveDate,
        _reason: WithdrawalReason,
        _notes: Option<&str>,
    ) -> CollaboratorOutcome {
        let mut store = self.store.lock().expect("placement mutex poisoned");
        match store.bookings.get_mut(id) {
            None => CollaboratorOutcome::NotFound,
            Some(booking) if booking.status == BookingStatus::Withdrawn => {
                CollaboratorOutcome::Success
            }
            Some(booking) if booking.arrival_recorded => {
                CollaboratorOutcome::ValidationError("booking has a recorded arrival".to_string())
            }
            Some(booking) => {
                booking.status = BookingStatus::Withdrawn;
                CollaboratorOutcome::Success
            }
        }
    }
}

impl ApplicationWithdrawalPolicy for InMemoryPlacements {
    fn application_may_be_withdrawn(&self, application: &Application) -> bool {
        matches!(
            application.status,
            ApplicationStatus::Started | ApplicationStatus::Submitted
        )
    }
}

/// Sink forwarding cascade-item failures to the log stream.
#[derive(Default, Clone)]
pub(crate) struct LoggingCascadeSink;

impl CascadeFailureSink for LoggingCascadeSink {
    fn report(&self, failure: CascadeFailure) {
        tracing::warn!(
            root = %failure.root,
            entity = %failure.entity,
            outcome = %failure.outcome.describe(),
            "cascade withdrawal left a descendant behind"
        );
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date")
}

/// Seeds the walkthrough chain: one application with a matched placement
/// request and booking, a second request still awaiting a decision, and a
/// legacy implicit match request.
pub(crate) fn seed_demo_placements(placements: &InMemoryPlacements, arrived_booking: bool) {
    placements.add_application(Application {
        id: EntityId::new("app-2025-0117"),
        status: ApplicationStatus::Submitted,
        arrival_date: Some(date(2025, 2, 3)),
    });

    placements.add_placement_request(PlacementRequest {
        id: EntityId::new("pr-alpha"),
        application_id: EntityId::new("app-2025-0117"),
        status: PlacementRequestStatus::Granted,
        superseded: false,
        submitted_at: Some(date(2025, 1, 20)),
        expected_arrival: date(2025, 4, 1),
        duration_days: 84,
    });
    placements.add_placement_request(PlacementRequest {
        id: EntityId::new("pr-beta"),
        application_id: EntityId::new("app-2025-0117"),
        status: PlacementRequestStatus::AwaitingDecision,
        superseded: false,
        submitted_at: Some(date(2025, 2, 14)),
        expected_arrival: date(2025, 7, 1),
        duration_days: 56,
    });

    placements.add_match_request(MatchRequest {
        id: EntityId::new("mr-alpha"),
        application_id: EntityId::new("app-2025-0117"),
        placement_request_id: Some(EntityId::new("pr-alpha")),
        status: MatchRequestStatus::Open,
        expected_arrival: date(2025, 4, 1),
        duration_days: 84,
    });
    placements.add_match_request(MatchRequest {
        id: EntityId::new("mr-legacy"),
        application_id: EntityId::new("app-2025-0117"),
        placement_request_id: None,
        status: MatchRequestStatus::Open,
        expected_arrival: date(2025, 2, 3),
        duration_days: 84,
    });

    placements.add_booking(Booking {
        id: EntityId::new("bk-oak-12"),
        application_id: EntityId::new("app-2025-0117"),
        match_request_id: EntityId::new("mr-alpha"),
        premises: "Oak House".to_string(),
        status: BookingStatus::Active,
        arrival_recorded: arrived_booking,
        non_arrival_confirmed: false,
        arrival_date: date(2025, 4, 1),
        departure_date: date(2025, 6, 24),
        transferred_from: None,
    });
}
