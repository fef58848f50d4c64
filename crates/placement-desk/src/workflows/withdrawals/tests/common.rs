use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::workflows::withdrawals::domain::{
    ActingUser, Application, ApplicationStatus, Booking, BookingStatus, EntityId, EntityKind,
    EntityRef, MatchRequest, MatchRequestStatus, Permission, PlacementRequest,
    PlacementRequestStatus, WithdrawalReason,
};
use crate::workflows::withdrawals::repository::{
    ApplicationWithdrawalPolicy, CascadeFailure, CascadeFailureSink, CollaboratorOutcome,
    DirectoryError, WithdrawalCollaborators, WithdrawalDirectory,
};
use crate::workflows::withdrawals::service::WithdrawalService;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

pub(super) fn arrival() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date")
}

pub(super) fn id(value: &str) -> EntityId {
    EntityId::new(value)
}

pub(super) fn manager() -> ActingUser {
    ActingUser::new(
        "duty-manager",
        [
            Permission::WithdrawApplication,
            Permission::WithdrawPlacementRequest,
            Permission::WithdrawMatchRequest,
            Permission::WithdrawBooking,
        ],
    )
}

pub(super) fn user_with(permissions: impl IntoIterator<Item = Permission>) -> ActingUser {
    ActingUser::new("caseworker", permissions)
}

pub(super) fn application(id_value: &str) -> Application {
    Application {
        id: id(id_value),
        status: ApplicationStatus::Submitted,
        arrival_date: None,
    }
}

pub(super) fn placement_request(id_value: &str, application_id: &str) -> PlacementRequest {
    PlacementRequest {
        id: id(id_value),
        application_id: id(application_id),
        status: PlacementRequestStatus::Granted,
        superseded: false,
        submitted_at: Some(today()),
        expected_arrival: arrival(),
        duration_days: 84,
    }
}

pub(super) fn match_request(
    id_value: &str,
    application_id: &str,
    placement_request_id: Option<&str>,
) -> MatchRequest {
    MatchRequest {
        id: id(id_value),
        application_id: id(application_id),
        placement_request_id: placement_request_id.map(id),
        status: MatchRequestStatus::Open,
        expected_arrival: arrival(),
        duration_days: 84,
    }
}

pub(super) fn booking(id_value: &str, application_id: &str, match_request_id: &str) -> Booking {
    Booking {
        id: id(id_value),
        application_id: id(application_id),
        match_request_id: id(match_request_id),
        premises: "Oak House".to_string(),
        status: BookingStatus::Active,
        arrival_recorded: false,
        non_arrival_confirmed: false,
        arrival_date: arrival(),
        departure_date: arrival() + chrono::Duration::days(84),
        transferred_from: None,
    }
}

#[derive(Default)]
struct DirectoryStore {
    applications: HashMap<EntityId, Application>,
    placement_requests: HashMap<EntityId, PlacementRequest>,
    match_requests: HashMap<EntityId, MatchRequest>,
    bookings: HashMap<EntityId, Booking>,
}

/// Mutex-backed directory fake serving relationship queries in id order.
#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    store: Arc<Mutex<DirectoryStore>>,
}

impl MemoryDirectory {
    pub(super) fn add_application(&self, application: Application) {
        let mut store = self.store.lock().expect("directory mutex poisoned");
        store
            .applications
            .insert(application.id.clone(), application);
    }

    pub(super) fn add_placement_request(&self, request: PlacementRequest) {
        let mut store = self.store.lock().expect("directory mutex poisoned");
        store.placement_requests.insert(request.id.clone(), request);
    }

    pub(super) fn add_match_request(&self, request: MatchRequest) {
        let mut store = self.store.lock().expect("directory mutex poisoned");
        store.match_requests.insert(request.id.clone(), request);
    }

    pub(super) fn add_booking(&self, booking: Booking) {
        let mut store = self.store.lock().expect("directory mutex poisoned");
        store.bookings.insert(booking.id.clone(), booking);
    }
}

impl WithdrawalDirectory for MemoryDirectory {
    fn application(&self, id: &EntityId) -> Result<Option<Application>, DirectoryError> {
        let store = self.store.lock().expect("directory mutex poisoned");
        Ok(store.applications.get(id).cloned())
    }

    fn placement_request(
        &self,
        id: &EntityId,
    ) -> Result<Option<PlacementRequest>, DirectoryError> {
        let store = self.store.lock().expect("directory mutex poisoned");
        Ok(store.placement_requests.get(id).cloned())
    }

    fn match_request(&self, id: &EntityId) -> Result<Option<MatchRequest>, DirectoryError> {
        let store = self.store.lock().expect("directory mutex poisoned");
        Ok(store.match_requests.get(id).cloned())
    }

    fn booking(&self, id: &EntityId) -> Result<Option<Booking>, DirectoryError> {
        let store = self.store.lock().expect("directory mutex poisoned");
        Ok(store.bookings.get(id).cloned())
    }

    fn placement_requests_for_application(
        &self,
        application_id: &EntityId,
    ) -> Result<Vec<PlacementRequest>, DirectoryError> {
        let store = self.store.lock().expect("directory mutex poisoned");
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
        let store = self.store.lock().expect("directory mutex poisoned");
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
        let store = self.store.lock().expect("directory mutex poisoned");
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
        let store = self.store.lock().expect("directory mutex poisoned");
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

/// Policy fake; the real rule lives outside the engine.
pub(super) struct StubPolicy {
    allow: bool,
}

impl StubPolicy {
    pub(super) fn allowing() -> Self {
        Self { allow: true }
    }

    pub(super) fn denying() -> Self {
        Self { allow: false }
    }
}

impl ApplicationWithdrawalPolicy for StubPolicy {
    fn application_may_be_withdrawn(&self, application: &Application) -> bool {
        self.allow && application.status != ApplicationStatus::Withdrawn
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct WithdrawalCall {
    pub(super) entity: EntityRef,
    pub(super) reason: WithdrawalReason,
    pub(super) occurred_at: Option<NaiveDate>,
    pub(super) other_reason: Option<String>,
}

/// Collaborator fake recording every invocation; individual entities can be
/// primed to fail.
#[derive(Default)]
pub(super) struct RecordingCollaborators {
    calls: Mutex<Vec<WithdrawalCall>>,
    failures: Mutex<HashMap<EntityId, CollaboratorOutcome>>,
}

impl RecordingCollaborators {
    pub(super) fn calls(&self) -> Vec<WithdrawalCall> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    pub(super) fn fail_with(&self, id: EntityId, outcome: CollaboratorOutcome) {
        self.failures
            .lock()
            .expect("failure mutex poisoned")
            .insert(id, outcome);
    }

    fn record(&self, call: WithdrawalCall) -> CollaboratorOutcome {
        let outcome = self
            .failures
            .lock()
            .expect("failure mutex poisoned")
            .get(&call.entity.id)
            .cloned()
            .unwrap_or(CollaboratorOutcome::Success);
        self.calls.lock().expect("call mutex poisoned").push(call);
        outcome
    }
}

impl WithdrawalCollaborators for RecordingCollaborators {
    fn withdraw_application(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        reason: WithdrawalReason,
        other_reason: Option<&str>,
    ) -> CollaboratorOutcome {
        self.record(WithdrawalCall {
            entity: EntityRef::new(EntityKind::Application, id.clone()),
            reason,
            occurred_at: None,
            other_reason: other_reason.map(str::to_string),
        })
    }

    fn withdraw_placement_request(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        reason: WithdrawalReason,
    ) -> CollaboratorOutcome {
        self.record(WithdrawalCall {
            entity: EntityRef::new(EntityKind::PlacementRequest, id.clone()),
            reason,
            occurred_at: None,
            other_reason: None,
        })
    }

    fn withdraw_match_request(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        reason: WithdrawalReason,
    ) -> CollaboratorOutcome {
        self.record(WithdrawalCall {
            entity: EntityRef::new(EntityKind::MatchRequest, id.clone()),
            reason,
            occurred_at: None,
            other_reason: None,
        })
    }

    fn withdraw_booking(
        &self,
        id: &EntityId,
        _user: &ActingUser,
        occurred_at: NaiveDate,
        reason: WithdrawalReason,
        notes: Option<&str>,
    ) -> CollaboratorOutcome {
        self.record(WithdrawalCall {
            entity: EntityRef::new(EntityKind::Booking, id.clone()),
            reason,
            occurred_at: Some(occurred_at),
            other_reason: notes.map(str::to_string),
        })
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    failures: Mutex<Vec<CascadeFailure>>,
}

impl RecordingSink {
    pub(super) fn failures(&self) -> Vec<CascadeFailure> {
        self.failures.lock().expect("sink mutex poisoned").clone()
    }
}

impl CascadeFailureSink for RecordingSink {
    fn report(&self, failure: CascadeFailure) {
        self.failures
            .lock()
            .expect("sink mutex poisoned")
            .push(failure);
    }
}

pub(super) type TestService =
    WithdrawalService<MemoryDirectory, StubPolicy, RecordingCollaborators, RecordingSink>;

pub(super) struct TestHarness {
    pub(super) service: TestService,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) collaborators: Arc<RecordingCollaborators>,
    pub(super) failures: Arc<RecordingSink>,
}

pub(super) fn harness() -> TestHarness {
    harness_with_policy(StubPolicy::allowing())
}

pub(super) fn harness_with_policy(policy: StubPolicy) -> TestHarness {
    let directory = Arc::new(MemoryDirectory::default());
    let collaborators = Arc::new(RecordingCollaborators::default());
    let failures = Arc::new(RecordingSink::default());
    let service = WithdrawalService::new(
        directory.clone(),
        Arc::new(policy),
        collaborators.clone(),
        failures.clone(),
    );
    TestHarness {
        service,
        directory,
        collaborators,
        failures,
    }
}

/// Seeds the canonical chain: app-1 -> pr-1 -> mr-1 -> bk-1.
pub(super) fn seed_chain(directory: &MemoryDirectory) {
    directory.add_application(application("app-1"));
    directory.add_placement_request(placement_request("pr-1", "app-1"));
    directory.add_match_request(match_request("mr-1", "app-1", Some("pr-1")));
    directory.add_booking(booking("bk-1", "app-1", "mr-1"));
}
