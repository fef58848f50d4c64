use serde::{Deserialize, Serialize};

use super::domain::{
    ActingUser, Application, ApplicationStatus, Booking, BookingStatus, EntityKind, MatchRequest,
    MatchRequestStatus, Permission, PlacementRequest, PlacementRequestStatus,
};

/// Why a record must never be withdrawn, not even by cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    ArrivalRecorded,
    NonArrivalRecorded,
}

impl BlockingReason {
    pub const fn label(self) -> &'static str {
        match self {
            BlockingReason::ArrivalRecorded => "arrival_recorded",
            BlockingReason::NonArrivalRecorded => "non_arrival_recorded",
        }
    }

    /// One-line explanation surfaced to callers asking why a chain cannot be
    /// withdrawn in full.
    pub const fn note(self) -> &'static str {
        match self {
            BlockingReason::ArrivalRecorded => {
                "1 or more placements cannot be withdrawn as they have an arrival"
            }
            BlockingReason::NonArrivalRecorded => {
                "1 or more placements cannot be withdrawn as they have a recorded non-arrival"
            }
        }
    }
}

/// Snapshot of a single record's withdrawal standing for a given user.
///
/// `user_may_directly_withdraw` is about the acting user only; a cascade
/// withdrawal needs just `withdrawable` and no blocking reason on the node
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawableState {
    pub withdrawable: bool,
    pub withdrawn: bool,
    pub user_may_directly_withdraw: bool,
    pub blocking_reason: Option<BlockingReason>,
}

/// State of an application. Whether a live application may be withdrawn at
/// all is a business rule owned by a collaborator; its verdict arrives here
/// as `policy_allows`.
pub fn application_state(
    application: &Application,
    policy_allows: bool,
    user: &ActingUser,
) -> WithdrawableState {
    let withdrawn = application.status == ApplicationStatus::Withdrawn;
    WithdrawableState {
        withdrawable: !withdrawn && policy_allows,
        withdrawn,
        user_may_directly_withdraw: user.can(Permission::direct_withdrawal(EntityKind::Application)),
        blocking_reason: None,
    }
}

/// State of an explicit request for placement. A recorded refusal is final.
pub fn placement_request_state(request: &PlacementRequest, user: &ActingUser) -> WithdrawableState {
    let withdrawn = request.status == PlacementRequestStatus::Withdrawn;
    let decided = request.status == PlacementRequestStatus::Refused;
    WithdrawableState {
        withdrawable: !withdrawn && !decided,
        withdrawn,
        user_may_directly_withdraw: user
            .can(Permission::direct_withdrawal(EntityKind::PlacementRequest)),
        blocking_reason: None,
    }
}

/// State of a match request. An unable-to-match outcome is final.
pub fn match_request_state(request: &MatchRequest, user: &ActingUser) -> WithdrawableState {
    let withdrawn = request.status == MatchRequestStatus::Withdrawn;
    let decided = request.status == MatchRequestStatus::UnableToMatch;
    WithdrawableState {
        withdrawable: !withdrawn && !decided,
        withdrawn,
        user_may_directly_withdraw: user
            .can(Permission::direct_withdrawal(EntityKind::MatchRequest)),
        blocking_reason: None,
    }
}

/// State of a booking. A recorded arrival or confirmed non-arrival is the
/// point of no return: the booking is not withdrawable and carries a
/// blocking reason that bubbles up the tree.
pub fn booking_state(booking: &Booking, user: &ActingUser) -> WithdrawableState {
    let withdrawn = booking.status == BookingStatus::Withdrawn;
    let blocking_reason = if booking.arrival_recorded {
        Some(BlockingReason::ArrivalRecorded)
    } else if booking.non_arrival_confirmed {
        Some(BlockingReason::NonArrivalRecorded)
    } else {
        None
    };

    WithdrawableState {
        withdrawable: !withdrawn && blocking_reason.is_none(),
        withdrawn,
        user_may_directly_withdraw: user.can(Permission::direct_withdrawal(EntityKind::Booking)),
        blocking_reason,
    }
}
