//! Simulated ticket buyer.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use seatbook_common::{
    BookingError, BookingId, BookingRequest, PaymentStatus, Result, SeatNumber, Tier, UserId,
};
use seatbook_coordinator::{BookingOutcome, Coordinator};

use crate::metrics::SimulationMetrics;

/// How a single booking call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Replayed,
    Conflict,
    Rejected,
}

impl Outcome {
    /// Classify a booking result.
    pub fn of(result: &Result<BookingOutcome>) -> Self {
        match result {
            Ok(outcome) if outcome.replayed => Outcome::Replayed,
            Ok(_) => Outcome::Created,
            Err(BookingError::Conflict(_)) => Outcome::Conflict,
            Err(_) => Outcome::Rejected,
        }
    }
}

/// A buyer that books random seats, sometimes double clicking.
pub struct SimulatedClient {
    /// Buyer identifier.
    pub id: UserId,
    coordinator: Arc<Coordinator>,
    rng: StdRng,
    /// Share of calls re-sent with the same idempotency key.
    retry_ratio: f64,
    /// Share of calls whose payment failed.
    payment_failure_ratio: f64,
}

impl SimulatedClient {
    /// Create a new simulated client.
    pub fn new(
        id: impl Into<UserId>,
        coordinator: Arc<Coordinator>,
        rng: StdRng,
        retry_ratio: f64,
        payment_failure_ratio: f64,
    ) -> Self {
        Self {
            id: id.into(),
            coordinator,
            rng,
            retry_ratio: retry_ratio.clamp(0.0, 1.0),
            payment_failure_ratio: payment_failure_ratio.clamp(0.0, 1.0),
        }
    }

    /// Issue `requests` bookings and return the ids of those this client created.
    pub async fn run(
        mut self,
        requests: usize,
        metrics: Arc<RwLock<SimulationMetrics>>,
    ) -> Vec<BookingId> {
        let capacity = self.coordinator.venue().total_capacity();
        let mut created = Vec::new();

        for n in 0..requests {
            let seat = self.rng.gen_range(1..=capacity);
            let request = self.request(n, seat);

            let (result, latency) = self.book(request.clone());
            let outcome = Outcome::of(&result);
            metrics.write().await.record(outcome, latency);

            if let Ok(booking) = &result {
                if !booking.replayed {
                    created.push(booking.record.id);
                }
            }

            if self.rng.gen_bool(self.retry_ratio) {
                let (retry, latency) = self.book(request);
                let mut metrics = metrics.write().await;
                metrics.record(Outcome::of(&retry), latency);
                if !retry_matches(&result, &retry) {
                    warn!(user_id = %self.id, seat, "Retry answered differently from original");
                    metrics.record_replay_mismatch();
                }
            }

            tokio::task::yield_now().await;
        }

        debug!(user_id = %self.id, created = created.len(), "Client finished");
        created
    }

    /// Try every seat in `seats` once, in random order.
    pub async fn rush(
        mut self,
        seats: Vec<SeatNumber>,
        metrics: Arc<RwLock<SimulationMetrics>>,
    ) -> Vec<BookingId> {
        let mut order = seats;
        order.shuffle(&mut self.rng);

        let mut created = Vec::new();
        for (n, seat) in order.into_iter().enumerate() {
            let request = self.request(n, seat);
            let (result, latency) = self.book(request);
            metrics.write().await.record(Outcome::of(&result), latency);
            if let Ok(booking) = result {
                created.push(booking.record.id);
            }
            tokio::task::yield_now().await;
        }
        created
    }

    fn request(&mut self, n: usize, seat: SeatNumber) -> BookingRequest {
        let tier = self
            .coordinator
            .venue()
            .tier_for_seat(seat)
            .map_or(Tier::Ga, |spec| spec.tier);

        let payment = if self.rng.gen_bool(self.payment_failure_ratio) {
            PaymentStatus::Failed
        } else {
            PaymentStatus::Confirmed
        };

        BookingRequest::new(self.id.clone(), tier, seat, format!("{}-{n}", self.id))
            .with_payment(format!("pay-{}-{n}", self.id), payment)
    }

    fn book(&self, request: BookingRequest) -> (Result<BookingOutcome>, u64) {
        let start = Instant::now();
        let result = self.coordinator.book(request);
        (result, start.elapsed().as_micros() as u64)
    }
}

/// A retry must be answered with the original booking, or fail the same way.
fn retry_matches(original: &Result<BookingOutcome>, retry: &Result<BookingOutcome>) -> bool {
    match (original, retry) {
        (Ok(first), Ok(again)) => again.replayed && again.record.id == first.record.id,
        (Err(first), Err(again)) => first == again,
        _ => false,
    }
}
