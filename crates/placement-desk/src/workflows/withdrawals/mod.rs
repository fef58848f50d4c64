//! Withdrawal cascade over a placement chain.
//!
//! An application's dependent records form a tree: application → submitted,
//! non-superseded placement requests → match request → bookings, plus a
//! legacy edge where a match request hangs directly off the application.
//! Withdrawing a record must also withdraw its still-open dependents, skip
//! anything past the point of no return (a booking with a recorded arrival
//! stays put, and the reason is reported up its whole ancestry), and never
//! touch a different application's chain.
//!
//! The pieces: per-kind state providers ([`state`]), the recursive tree
//! snapshot ([`tree`], built by [`builder`]), the boundary traits for the
//! directory and the per-kind withdraw collaborators ([`repository`]), and
//! the orchestrating [`service`] that validates the root, delegates its
//! transition, and cascades over the same snapshot under a size cap and an
//! ownership check.

pub mod builder;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod state;
pub mod tree;

#[cfg(test)]
mod tests;

pub use builder::WithdrawableTreeBuilder;
pub use domain::{
    ActingUser, Application, ApplicationStatus, Booking, BookingStatus, DatePeriod, EntityId,
    EntityKind, EntityRef, MatchRequest, MatchRequestStatus, Permission, PlacementRequest,
    PlacementRequestStatus, WithdrawalReason,
};
pub use repository::{
    ApplicationWithdrawalPolicy, CascadeFailure, CascadeFailureSink, CollaboratorOutcome,
    DirectoryError, WithdrawalCollaborators, WithdrawalDirectory,
};
pub use router::withdrawal_router;
pub use service::{
    WithdrawableEntityView, WithdrawalError, WithdrawalReceipt, WithdrawalService,
    MAX_CASCADE_WITHDRAWALS,
};
pub use state::{BlockingReason, WithdrawableState};
pub use tree::WithdrawableTreeNode;
