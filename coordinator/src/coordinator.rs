//! Core coordinator implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use seatbook_common::{
    BookingError, BookingRecord, BookingRequest, BookingStatus, Result, SeatNumber, VenueLayout,
    INVALID_SEAT_NUMBER, SEAT_ALREADY_BOOKED,
};

use crate::availability::{aggregate, AvailabilityReport};
use crate::config::CoordinatorConfig;
use crate::idempotency::IdempotencyStore;
use crate::metrics::{Metrics, SharedMetrics};
use crate::seat_store::SeatStore;
use crate::state::CoordinatorState;

/// Result of a booking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOutcome {
    /// The booking that holds the seat.
    pub record: BookingRecord,
    /// True when the call was answered from an earlier booking with the same key.
    pub replayed: bool,
}

/// The main coordinator that serves booking traffic.
pub struct Coordinator {
    /// Configuration.
    config: CoordinatorConfig,
    /// Node ID for this coordinator instance.
    node_id: String,
    /// Current coordinator state.
    state: RwLock<CoordinatorState>,
    /// Booking calls currently inside `book`.
    in_flight: AtomicUsize,
    /// Seat reservation store.
    seats: Arc<SeatStore>,
    /// Canonical orders by idempotency key.
    idempotency: Arc<IdempotencyStore>,
    /// Counters.
    metrics: SharedMetrics,
}

/// Decrements the in-flight counter when a booking call returns.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Coordinator {
    /// Create a new coordinator instance in the `Starting` state.
    pub fn new(config: CoordinatorConfig) -> Self {
        let node_id = config
            .node_id
            .clone()
            .unwrap_or_else(|| format!("seatbook-{}", Uuid::new_v4()));
        let seats = Arc::new(SeatStore::new(Arc::new(config.venue.clone())));

        Self {
            config,
            node_id,
            state: RwLock::new(CoordinatorState::Starting),
            in_flight: AtomicUsize::new(0),
            seats,
            idempotency: Arc::new(IdempotencyStore::new()),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Validate the configuration and start accepting bookings.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn start(&self) -> Result<()> {
        info!("Starting coordinator");

        self.config.validate()?;

        let mut state = self.state.write();
        if state.is_terminal() {
            return Err(BookingError::configuration("coordinator already stopped"));
        }
        *state = CoordinatorState::Running;

        info!(
            capacity = self.config.venue.total_capacity(),
            tiers = self.config.venue.tiers().len(),
            "Coordinator started successfully"
        );
        Ok(())
    }

    /// Stop accepting bookings and wait for in-flight ones to finish.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn stop(&self) {
        info!("Stopping coordinator");

        *self.state.write() = CoordinatorState::ShuttingDown;
        self.drain_in_flight();
        *self.state.write() = CoordinatorState::Stopped;

        info!(bookings = self.seats.len(), "Coordinator stopped");
    }

    /// Book a seat.
    ///
    /// Retries carrying the idempotency key of an earlier call are answered
    /// with the booking that call produced, flagged as a replay. A request
    /// for a seat held under a different key fails with `Conflict`.
    #[instrument(
        skip(self, request),
        fields(seat = request.seat, idempotency_key = %request.idempotency_key)
    )]
    pub fn book(&self, request: BookingRequest) -> Result<BookingOutcome> {
        self.metrics.booking_attempted();
        let _guard = self.enter()?;

        if let Err(e) = self.validate_request(&request) {
            self.metrics.invalid_request();
            warn!(error = %e, "Rejected booking request");
            return Err(e);
        }

        let canonical = self
            .idempotency
            .resolve(request.with_status(BookingStatus::Pending));

        // A settled key was normally booked already. It may also have been
        // settled by a payment callback without ever winning its seat.
        if canonical.status.is_final() {
            if let Ok(existing) = self.seats.lookup(canonical.seat) {
                let message = SEAT_ALREADY_BOOKED.to_string();
                return self.replay_or_conflict(&canonical, existing, message);
            }
        }

        let record = match self.seats.register(&canonical) {
            Ok(record) => record,
            Err(BookingError::Conflict(message)) => {
                return match self.seats.lookup(canonical.seat) {
                    Ok(existing) => self.replay_or_conflict(&canonical, existing, message),
                    Err(_) => {
                        self.metrics.conflict();
                        Err(BookingError::Conflict(message))
                    }
                };
            }
            Err(e) => {
                if matches!(e, BookingError::InvalidInput(_)) {
                    self.metrics.invalid_request();
                }
                return Err(e);
            }
        };

        if record.status.is_final() {
            self.idempotency.resolve(canonical.with_status(record.status));
        }

        self.metrics.booking_created(record.status);
        Ok(BookingOutcome {
            record,
            replayed: false,
        })
    }

    /// Check caller-side constraints the stores do not enforce.
    pub fn validate_request(&self, request: &BookingRequest) -> Result<()> {
        if request.user_id.is_blank() {
            return Err(BookingError::invalid_input("user id is required"));
        }

        if request.idempotency_key.is_blank() {
            return Err(BookingError::invalid_input("idempotency key is required"));
        }

        let venue = self.venue();
        if !venue.contains_seat(request.seat) {
            return Err(BookingError::invalid_input(INVALID_SEAT_NUMBER));
        }

        let spec = venue.spec_for(request.tier).ok_or_else(|| {
            BookingError::invalid_input(format!("tier {} is not sold at this venue", request.tier))
        })?;

        if !spec.contains(request.seat) {
            return Err(BookingError::invalid_input(format!(
                "seat {} is not in tier {}",
                request.seat, request.tier
            )));
        }

        Ok(())
    }

    /// Get the booking for a seat.
    pub fn lookup(&self, seat: SeatNumber) -> Result<BookingRecord> {
        let result = self.seats.lookup(seat);
        self.metrics.lookup(result.is_ok());
        result
    }

    /// Current per-tier availability.
    pub fn availability(&self) -> AvailabilityReport {
        aggregate(self.venue(), &self.seats.snapshot())
    }

    /// Collapse an order onto the canonical order for its key.
    pub fn resolve(&self, request: BookingRequest) -> BookingRequest {
        self.idempotency.resolve(request)
    }

    /// Get current coordinator state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Get the metrics handle.
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Get the configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Get the node ID.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Get the venue layout.
    pub fn venue(&self) -> &VenueLayout {
        self.seats.venue()
    }

    /// Get the seat store.
    pub fn seat_store(&self) -> &Arc<SeatStore> {
        &self.seats
    }

    /// Get the idempotency store.
    pub fn idempotency_store(&self) -> &Arc<IdempotencyStore> {
        &self.idempotency
    }

    fn enter(&self) -> Result<InFlight<'_>> {
        // Count first so `stop` cannot observe zero between the check and the work.
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(&self.in_flight);

        if !self.state().accepts_requests() {
            self.metrics.unavailable();
            return Err(BookingError::Unavailable {
                retry_after_ms: self.config.unavailable_retry_after.as_millis() as u64,
            });
        }

        Ok(guard)
    }

    /// Replay the seat's record if this key created it, otherwise conflict.
    fn replay_or_conflict(
        &self,
        canonical: &BookingRequest,
        existing: BookingRecord,
        message: String,
    ) -> Result<BookingOutcome> {
        if existing.idempotency_key == canonical.idempotency_key {
            return Ok(self.replay(existing));
        }

        self.metrics.conflict();
        warn!(
            seat = existing.seat,
            holder = %existing.idempotency_key,
            "Seat held under another idempotency key"
        );
        Err(BookingError::Conflict(message))
    }

    fn replay(&self, record: BookingRecord) -> BookingOutcome {
        self.metrics.replay();
        debug!(
            booking_id = %record.id,
            seat = record.seat,
            status = %record.status,
            "Replayed existing booking"
        );
        BookingOutcome {
            record,
            replayed: true,
        }
    }

    fn drain_in_flight(&self) {
        let deadline = Instant::now() + self.config.drain_timeout;

        while self.in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                warn!(
                    in_flight = self.in_flight.load(Ordering::Acquire),
                    "Drain timeout reached with bookings in flight"
                );
                return;
            }
            std::thread::yield_now();
        }
    }
}
