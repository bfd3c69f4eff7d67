//! Simulation controller.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use seatbook_common::{BookingId, BookingRequest, BookingStatus, IdempotencyKey, SeatNumber};
use seatbook_coordinator::Coordinator;

use crate::client::{Outcome, SimulatedClient};
use crate::metrics::SimulationMetrics;
use crate::scenario::{AssertCondition, Expect, Scenario, ScenarioStep};

/// Load profile for continuous mode.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    /// Concurrent clients.
    pub clients: usize,
    /// Bookings per client.
    pub requests_per_client: usize,
    /// Share of calls re-sent with the same key.
    pub retry_ratio: f64,
    /// Share of calls carrying a failed payment.
    pub payment_failure_ratio: f64,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

/// Controls the simulation.
pub struct SimulationController {
    /// Coordinator under test.
    coordinator: Arc<Coordinator>,
    /// Load profile.
    profile: LoadProfile,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Bookings created by simulated clients.
    created: Vec<BookingId>,
    /// Wall time spent issuing load.
    elapsed: Duration,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(coordinator: Arc<Coordinator>, profile: LoadProfile) -> Self {
        Self {
            coordinator,
            profile,
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            created: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Run in continuous mode: every client issues its bookings concurrently.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            clients = self.profile.clients,
            requests_per_client = self.profile.requests_per_client,
            retry_ratio = self.profile.retry_ratio,
            payment_failure_ratio = self.profile.payment_failure_ratio,
            "Running simulation in continuous mode"
        );

        let start = Instant::now();
        let handles: Vec<_> = (0..self.profile.clients)
            .map(|idx| {
                let client = self.client(idx, "client");
                let metrics = self.metrics.clone();
                let requests = self.profile.requests_per_client;
                tokio::spawn(client.run(requests, metrics))
            })
            .collect();

        for created in join_all(handles).await {
            self.created.extend(created.context("client task panicked")?);
        }
        self.elapsed += start.elapsed();

        self.verify_invariants().await
    }

    /// Run a scenario, failing on the first unmet expectation.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        let start = Instant::now();
        for (idx, step) in scenario.steps.iter().enumerate() {
            self.execute_step(step)
                .await
                .with_context(|| format!("scenario {} failed at step {}", scenario.name, idx + 1))?;
        }
        self.elapsed += start.elapsed();

        self.verify_invariants().await
    }

    /// Execute a single scenario step.
    async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Wait { millis } => {
                info!("Waiting {}ms", millis);
                tokio::time::sleep(Duration::from_millis(*millis)).await;
            }
            ScenarioStep::Book {
                user,
                tier,
                seat,
                key,
                payment,
                expect,
            } => {
                let request = BookingRequest::new(user.as_str(), *tier, *seat, key.as_str())
                    .with_payment(format!("pay-{key}"), *payment);

                let start = Instant::now();
                let result = self.coordinator.book(request);
                let outcome = Outcome::of(&result);
                self.metrics
                    .write()
                    .await
                    .record(outcome, start.elapsed().as_micros() as u64);

                info!(user = %user, seat, key = %key, ?outcome, "Booked");

                let matched = match (expect, &result) {
                    (Expect::Created, Ok(booking)) => !booking.replayed,
                    (Expect::Replayed, Ok(booking)) => booking.replayed,
                    (Expect::Conflict, _) => outcome == Outcome::Conflict,
                    (Expect::Invalid, Err(e)) => e.error_code() == "INVALID_INPUT",
                    _ => false,
                };
                if !matched {
                    bail!("expected {:?} for seat {}, got {:?}", expect, seat, result);
                }

                if let Ok(booking) = result {
                    if !booking.replayed {
                        self.created.push(booking.record.id);
                    }
                }
            }
            ScenarioStep::Resolve {
                user,
                tier,
                seat,
                key,
                status,
            } => {
                let canonical = self.coordinator.resolve(
                    BookingRequest::new(user.as_str(), *tier, *seat, key.as_str())
                        .with_status(*status),
                );
                info!(key = %key, status = %canonical.status, "Resolved");
            }
            ScenarioStep::Rush {
                first_seat,
                last_seat,
                clients,
            } => self.rush(*first_seat, *last_seat, *clients).await?,
            ScenarioStep::Assert { condition } => {
                info!("Asserting condition: {:?}", condition);
                self.check(condition)?;
            }
        }

        Ok(())
    }

    async fn rush(
        &mut self,
        first_seat: SeatNumber,
        last_seat: SeatNumber,
        clients: usize,
    ) -> anyhow::Result<()> {
        info!(first_seat, last_seat, clients, "Rushing seats");

        let seats: Vec<SeatNumber> = (first_seat..=last_seat).collect();
        let free = seats
            .iter()
            .filter(|seat| self.coordinator.seat_store().lookup(**seat).is_err())
            .count();

        let handles: Vec<_> = (0..clients)
            .map(|idx| {
                let client = self.client(idx, &format!("rush-{first_seat}-{last_seat}"));
                tokio::spawn(client.rush(seats.clone(), self.metrics.clone()))
            })
            .collect();

        let mut won = 0;
        for created in join_all(handles).await {
            let created = created.context("client task panicked")?;
            won += created.len();
            self.created.extend(created);
        }

        ensure!(
            won == free,
            "rush on seats {first_seat}-{last_seat} created {won} bookings for {free} free seats"
        );
        Ok(())
    }

    fn check(&self, condition: &AssertCondition) -> anyhow::Result<()> {
        match condition {
            AssertCondition::SeatBooked { seat, user } => {
                let record = self
                    .coordinator
                    .seat_store()
                    .lookup(*seat)
                    .with_context(|| format!("seat {seat} is not booked"))?;
                if let Some(user) = user {
                    ensure!(
                        record.user_id.as_str() == user.as_str(),
                        "seat {seat} booked by {}, expected {user}",
                        record.user_id
                    );
                }
            }
            AssertCondition::SeatFree { seat } => {
                ensure!(
                    self.coordinator.seat_store().lookup(*seat).is_err(),
                    "seat {seat} is booked"
                );
            }
            AssertCondition::ReservedCount { tier, count } => {
                let report = self.coordinator.availability();
                let actual = report
                    .tier(*tier)
                    .map(|t| t.reserved_count)
                    .with_context(|| format!("tier {tier} is not sold at this venue"))?;
                ensure!(actual == *count, "tier {tier} has {actual} reserved, expected {count}");
            }
            AssertCondition::Status { key, status } => {
                let actual = self
                    .coordinator
                    .idempotency_store()
                    .get(&IdempotencyKey::new(key.as_str()))
                    .map(|order| order.status)
                    .with_context(|| format!("no order for key {key}"))?;
                ensure!(actual == *status, "key {key} is {actual}, expected {status}");
            }
        }
        Ok(())
    }

    /// Check that every seat has at most one booking and that availability
    /// partitions every tier.
    pub async fn verify_invariants(&self) -> anyhow::Result<()> {
        let store = self.coordinator.seat_store();
        let records = store.records();

        let mut seats = HashSet::new();
        for record in &records {
            ensure!(seats.insert(record.seat), "seat {} has two bookings", record.seat);
            ensure!(
                store.lookup(record.seat)?.id == record.id,
                "seat {} resolves to a different booking",
                record.seat
            );
        }

        // Every booking a client was told it created is the one holding its seat.
        let stored: HashSet<BookingId> = records.iter().map(|r| r.id).collect();
        let created: HashSet<BookingId> = self.created.iter().copied().collect();
        ensure!(
            created.len() == self.created.len(),
            "a booking id was reported as created twice"
        );
        ensure!(
            created.is_subset(&stored),
            "{} created bookings are missing from the store",
            created.difference(&stored).count()
        );

        let report = self.coordinator.availability();
        for tier in &report.tiers {
            ensure!(
                tier.reserved_count + tier.available_count() == tier.total_seats,
                "tier {} does not partition its capacity",
                tier.tier
            );
            ensure!(
                tier.available.iter().all(|seat| !seats.contains(seat)),
                "tier {} lists a booked seat as available",
                tier.tier
            );
        }
        ensure!(
            report.reserved_total() as usize == records.len(),
            "availability counts {} reserved seats, store holds {}",
            report.reserved_total(),
            records.len()
        );

        let mismatches = self.metrics.read().await.replay_mismatches;
        if mismatches > 0 {
            warn!(mismatches, "Retries were answered inconsistently");
            bail!("{mismatches} retries were not answered with their original booking");
        }

        let settled = records.iter().filter(|r| r.status != BookingStatus::Pending).count();
        info!(
            bookings = records.len(),
            settled,
            "Invariants hold"
        );
        Ok(())
    }

    fn client(&self, idx: usize, prefix: &str) -> SimulatedClient {
        let rng = match self.profile.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(idx as u64)),
            None => StdRng::from_entropy(),
        };

        SimulatedClient::new(
            format!("{prefix}-{idx}"),
            self.coordinator.clone(),
            rng,
            self.profile.retry_ratio,
            self.profile.payment_failure_ratio,
        )
    }

    /// Get simulation metrics.
    pub async fn metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    /// Wall time spent issuing load.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
