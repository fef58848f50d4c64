use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identifier shared by every record kind in a placement chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of record kinds a placement chain can contain. All dispatch in
/// the withdrawal engine is an exhaustive match over this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    PlacementRequest,
    MatchRequest,
    Booking,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::PlacementRequest => "placement_request",
            EntityKind::MatchRequest => "match_request",
            EntityKind::Booking => "booking",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-qualified reference to a single record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Arrival/departure (or expected) window carried on tree nodes for
/// reporting. Never consulted by the cascade decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePeriod {
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

impl DatePeriod {
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Self {
        Self { arrival, departure }
    }

    pub fn from_duration(arrival: NaiveDate, duration_days: i64) -> Self {
        Self {
            arrival,
            departure: arrival + Duration::days(duration_days),
        }
    }
}

/// Direct-withdrawal capabilities, one per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    WithdrawApplication,
    WithdrawPlacementRequest,
    WithdrawMatchRequest,
    WithdrawBooking,
}

impl Permission {
    pub const fn label(self) -> &'static str {
        match self {
            Permission::WithdrawApplication => "withdraw_application",
            Permission::WithdrawPlacementRequest => "withdraw_placement_request",
            Permission::WithdrawMatchRequest => "withdraw_match_request",
            Permission::WithdrawBooking => "withdraw_booking",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "withdraw_application" => Some(Permission::WithdrawApplication),
            "withdraw_placement_request" => Some(Permission::WithdrawPlacementRequest),
            "withdraw_match_request" => Some(Permission::WithdrawMatchRequest),
            "withdraw_booking" => Some(Permission::WithdrawBooking),
            _ => None,
        }
    }

    /// The capability required to withdraw a record of the given kind
    /// directly. Cascade withdrawals are system-initiated and never consult
    /// permissions.
    pub const fn direct_withdrawal(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Application => Permission::WithdrawApplication,
            EntityKind::PlacementRequest => Permission::WithdrawPlacementRequest,
            EntityKind::MatchRequest => Permission::WithdrawMatchRequest,
            EntityKind::Booking => Permission::WithdrawBooking,
        }
    }
}

/// The user asking for a withdrawal. Authentication happens upstream; this
/// type only carries what the engine needs to answer permission questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
    pub permissions: BTreeSet<Permission>,
}

impl ActingUser {
    pub fn new(id: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id: id.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Reason recorded against a withdrawal. `Other` is accompanied by free text
/// supplied alongside the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalReason {
    DuplicateApplication,
    ErrorInApplication,
    NoLongerEligible,
    PlacementNoLongerRequired,
    Other,
}

impl WithdrawalReason {
    pub const fn label(self) -> &'static str {
        match self {
            WithdrawalReason::DuplicateApplication => "duplicate_application",
            WithdrawalReason::ErrorInApplication => "error_in_application",
            WithdrawalReason::NoLongerEligible => "no_longer_eligible",
            WithdrawalReason::PlacementNoLongerRequired => "placement_no_longer_required",
            WithdrawalReason::Other => "other",
        }
    }
}

/// The root record of a placement chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: EntityId,
    pub status: ApplicationStatus,
    /// Initial arrival date captured at submission. Legacy chains created a
    /// match request directly from this date, bypassing any placement
    /// request; its presence does not imply such a match request exists.
    pub arrival_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Started,
    Submitted,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Started => "started",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

/// An explicit discretionary request for a placement, attached to an
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub id: EntityId,
    pub application_id: EntityId,
    pub status: PlacementRequestStatus,
    /// A superseded request has been replaced by a newer revision and is
    /// excluded from the withdrawable tree.
    pub superseded: bool,
    pub submitted_at: Option<NaiveDate>,
    pub expected_arrival: NaiveDate,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementRequestStatus {
    AwaitingDecision,
    Granted,
    /// Terminal decision; a refused request can no longer be withdrawn.
    Refused,
    Withdrawn,
}

impl PlacementRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PlacementRequestStatus::AwaitingDecision => "awaiting_decision",
            PlacementRequestStatus::Granted => "granted",
            PlacementRequestStatus::Refused => "refused",
            PlacementRequestStatus::Withdrawn => "withdrawn",
        }
    }
}

/// The step that reserves a specific placement window. Created from a
/// placement request, or (legacy shape) directly from an application's
/// initial arrival date, in which case `placement_request_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: EntityId,
    pub application_id: EntityId,
    pub placement_request_id: Option<EntityId>,
    pub status: MatchRequestStatus,
    pub expected_arrival: NaiveDate,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRequestStatus {
    Open,
    /// Terminal decision; matching was abandoned and the request can no
    /// longer be withdrawn.
    UnableToMatch,
    Withdrawn,
}

impl MatchRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MatchRequestStatus::Open => "open",
            MatchRequestStatus::UnableToMatch => "unable_to_match",
            MatchRequestStatus::Withdrawn => "withdrawn",
        }
    }
}

/// A confirmed reservation at a premises. A transfer supersedes a booking
/// with a new one against the same match request, linked through
/// `transferred_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: EntityId,
    pub application_id: EntityId,
    pub match_request_id: EntityId,
    pub premises: String,
    pub status: BookingStatus,
    pub arrival_recorded: bool,
    pub non_arrival_confirmed: bool,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub transferred_from: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Withdrawn,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Withdrawn => "withdrawn",
        }
    }
}
