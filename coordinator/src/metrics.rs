//! Metrics collection for coordinator monitoring.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use seatbook_common::BookingStatus;

/// Coordinator metrics.
#[derive(Default)]
pub struct Metrics {
    /// Booking calls received.
    pub bookings_attempted: AtomicU64,
    /// Bookings newly registered.
    pub bookings_created: AtomicU64,
    /// Registered bookings by derived status.
    pub bookings_confirmed: AtomicU64,
    pub bookings_pending: AtomicU64,
    pub bookings_canceled: AtomicU64,
    /// Requests that lost a seat to another booking.
    pub conflicts: AtomicU64,
    /// Requests rejected by validation.
    pub invalid_requests: AtomicU64,
    /// Retries answered from an earlier booking.
    pub idempotent_replays: AtomicU64,
    /// Requests refused because the coordinator was not running.
    pub unavailable_rejections: AtomicU64,
    /// Seat lookups.
    pub lookups: AtomicU64,
    /// Seat lookups that found nothing.
    pub lookup_misses: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment booking attempts.
    pub fn booking_attempted(&self) {
        self.bookings_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a newly registered booking.
    pub fn booking_created(&self, status: BookingStatus) {
        self.bookings_created.fetch_add(1, Ordering::Relaxed);
        let by_status = match status {
            BookingStatus::Confirmed => &self.bookings_confirmed,
            BookingStatus::Pending => &self.bookings_pending,
            BookingStatus::Canceled => &self.bookings_canceled,
        };
        by_status.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a seat conflict.
    pub fn conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a validation failure.
    pub fn invalid_request(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an idempotent replay.
    pub fn replay(&self) {
        self.idempotent_replays.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request refused while not running.
    pub fn unavailable(&self) {
        self.unavailable_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup.
    pub fn lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.lookup_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bookings_attempted: self.bookings_attempted.load(Ordering::Relaxed),
            bookings_created: self.bookings_created.load(Ordering::Relaxed),
            bookings_confirmed: self.bookings_confirmed.load(Ordering::Relaxed),
            bookings_pending: self.bookings_pending.load(Ordering::Relaxed),
            bookings_canceled: self.bookings_canceled.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            idempotent_replays: self.idempotent_replays.load(Ordering::Relaxed),
            unavailable_rejections: self.unavailable_rejections.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let series = [
            ("bookings_attempted", "Booking requests received", s.bookings_attempted),
            ("bookings_created", "Bookings registered", s.bookings_created),
            ("bookings_confirmed", "Bookings registered as confirmed", s.bookings_confirmed),
            ("bookings_pending", "Bookings registered as pending", s.bookings_pending),
            ("bookings_canceled", "Bookings registered as canceled", s.bookings_canceled),
            ("conflicts", "Requests rejected because the seat was taken", s.conflicts),
            ("invalid_requests", "Requests rejected by validation", s.invalid_requests),
            ("idempotent_replays", "Retries answered from an earlier booking", s.idempotent_replays),
            ("unavailable_rejections", "Requests refused while not running", s.unavailable_rejections),
            ("lookups", "Seat lookups", s.lookups),
            ("lookup_misses", "Seat lookups without a booking", s.lookup_misses),
        ];

        let mut out = String::new();
        for (name, help, value) in series {
            let _ = writeln!(out, "# HELP seatbook_{name} {help}");
            let _ = writeln!(out, "# TYPE seatbook_{name} counter");
            let _ = writeln!(out, "seatbook_{name} {value}");
            out.push('\n');
        }
        out
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bookings_attempted: u64,
    pub bookings_created: u64,
    pub bookings_confirmed: u64,
    pub bookings_pending: u64,
    pub bookings_canceled: u64,
    pub conflicts: u64,
    pub invalid_requests: u64,
    pub idempotent_replays: u64,
    pub unavailable_rejections: u64,
    pub lookups: u64,
    pub lookup_misses: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
