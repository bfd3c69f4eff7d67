//! Seatbook Coordinator
//!
//! The in-memory core of the seat booking service. Per-seat locks guarantee
//! that each seat is sold at most once, per-key locks collapse retried
//! requests onto a single canonical order, and availability is derived from
//! a snapshot of the seat store.

pub mod availability;
pub mod config;
pub mod coordinator;
pub mod idempotency;
pub mod keyed_lock;
pub mod metrics;
pub mod seat_store;
pub mod state;

pub use availability::{aggregate, AvailabilityReport, TierAvailability};
pub use config::CoordinatorConfig;
pub use coordinator::{BookingOutcome, Coordinator};
pub use idempotency::IdempotencyStore;
pub use keyed_lock::KeyedLocks;
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use seat_store::{ReservedSeat, SeatStore};
pub use state::CoordinatorState;
