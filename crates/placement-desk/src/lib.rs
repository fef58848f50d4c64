//! Withdrawal orchestration for supervised accommodation placements.
//!
//! An application for a placement can spawn a chain of dependent records:
//! requests for placement, match requests reserving a placement window, and
//! bookings at a premises. Withdrawing any record in the chain must be
//! reflected down its dependents without ever touching records that have
//! passed the point of no return, and without leaking into another
//! application's chain. The `workflows::withdrawals` module holds that
//! engine; `config`, `telemetry`, and `error` carry the service plumbing.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
