use chrono::NaiveDate;

use super::domain::{
    ActingUser, Application, Booking, EntityId, EntityRef, MatchRequest, PlacementRequest,
    WithdrawalReason,
};

/// Read-only source of the records a withdrawable tree is built from.
///
/// Implementations are expected to serve all queries for one operation from
/// a single consistent snapshot (in a database-backed implementation, the
/// transaction that also holds the root's pessimistic lock). Relationship
/// queries must return records in a stable order so repeated builds against
/// unchanged data yield structurally identical trees.
pub trait WithdrawalDirectory: Send + Sync {
    fn application(&self, id: &EntityId) -> Result<Option<Application>, DirectoryError>;
    fn placement_request(&self, id: &EntityId) -> Result<Option<PlacementRequest>, DirectoryError>;
    fn match_request(&self, id: &EntityId) -> Result<Option<MatchRequest>, DirectoryError>;
    fn booking(&self, id: &EntityId) -> Result<Option<Booking>, DirectoryError>;

    /// Every placement request attached to the application, superseded or
    /// not; the tree builder applies the superseded/unsubmitted filter.
    fn placement_requests_for_application(
        &self,
        application_id: &EntityId,
    ) -> Result<Vec<PlacementRequest>, DirectoryError>;

    /// The match request created from a placement request, if one exists.
    fn match_request_for_placement_request(
        &self,
        placement_request_id: &EntityId,
    ) -> Result<Option<MatchRequest>, DirectoryError>;

    /// The legacy match request created directly from the application's
    /// initial arrival date, outside any placement request.
    fn implicit_match_request(
        &self,
        application_id: &EntityId,
    ) -> Result<Option<MatchRequest>, DirectoryError>;

    /// Every booking created against the match request, transfer chains
    /// included.
    fn bookings_for_match_request(
        &self,
        match_request_id: &EntityId,
    ) -> Result<Vec<Booking>, DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Business rule deciding whether a live application may itself be
/// withdrawn. The engine consumes the verdict as a black box.
pub trait ApplicationWithdrawalPolicy: Send + Sync {
    fn application_may_be_withdrawn(&self, application: &Application) -> bool;
}

/// Result reported by a per-kind withdraw collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorOutcome {
    Success,
    NotFound,
    Unauthorized,
    ValidationError(String),
}

impl CollaboratorOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CollaboratorOutcome::Success)
    }

    pub fn describe(&self) -> String {
        match self {
            CollaboratorOutcome::Success => "success".to_string(),
            CollaboratorOutcome::NotFound => "not found".to_string(),
            CollaboratorOutcome::Unauthorized => "unauthorized".to_string(),
            CollaboratorOutcome::ValidationError(message) => {
                format!("validation error: {message}")
            }
        }
    }
}

/// The per-kind withdraw operations the cascade executor delegates to.
///
/// Each operation owns its record's actual transition (field updates,
/// history, notifications) and must treat an already-withdrawn record as a
/// success with no further side effects.
pub trait WithdrawalCollaborators: Send + Sync {
    fn withdraw_application(
        &self,
        id: &EntityId,
        user: &ActingUser,
        reason: WithdrawalReason,
        other_reason: Option<&str>,
    ) -> CollaboratorOutcome;

    fn withdraw_placement_request(
        &self,
        id: &EntityId,
        user: &ActingUser,
        reason: WithdrawalReason,
    ) -> CollaboratorOutcome;

    fn withdraw_match_request(
        &self,
        id: &EntityId,
        user: &ActingUser,
        reason: WithdrawalReason,
    ) -> CollaboratorOutcome;

    fn withdraw_booking(
        &self,
        id: &EntityId,
        user: &ActingUser,
        occurred_at: NaiveDate,
        reason: WithdrawalReason,
        notes: Option<&str>,
    ) -> CollaboratorOutcome;
}

/// A cascade item that failed after the root withdrawal already succeeded.
/// Recovered locally: reported here and logged, never rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    pub root: EntityRef,
    pub entity: EntityRef,
    pub outcome: CollaboratorOutcome,
}

/// Structured sink for cascade-item failures, so operational tooling and
/// tests can observe partial failure without parsing log output.
pub trait CascadeFailureSink: Send + Sync {
    fn report(&self, failure: CascadeFailure);
}
