//! Simulation metrics.

use std::collections::VecDeque;

use crate::client::Outcome;

/// Simulation metrics.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Booking calls issued, retries included.
    pub total_requests: u64,
    /// Calls that created a booking.
    pub created: u64,
    /// Calls answered as a replay of an earlier booking.
    pub replayed: u64,
    /// Calls that lost their seat to another key.
    pub conflicts: u64,
    /// Calls rejected as invalid or unavailable.
    pub rejected: u64,
    /// Retries whose answer differed from the original call.
    pub replay_mismatches: u64,
    /// Latency samples (µs).
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            created: 0,
            replayed: 0,
            conflicts: 0,
            rejected: 0,
            replay_mismatches: 0,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record the outcome of one booking call.
    pub fn record(&mut self, outcome: Outcome, latency_us: u64) {
        self.total_requests += 1;
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Replayed => self.replayed += 1,
            Outcome::Conflict => self.conflicts += 1,
            Outcome::Rejected => self.rejected += 1,
        }

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    /// Record a retry that was not answered like its original.
    pub fn record_replay_mismatch(&mut self) {
        self.replay_mismatches += 1;
    }

    /// Get average latency in µs.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p50 latency.
    pub fn p50_latency_us(&self) -> u64 {
        self.percentile_latency(50)
    }

    /// Get p95 latency.
    pub fn p95_latency_us(&self) -> u64 {
        self.percentile_latency(95)
    }

    /// Get p99 latency.
    pub fn p99_latency_us(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Share of calls that ended holding a seat.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }

        (self.created + self.replayed) as f64 / self.total_requests as f64
    }

    /// Get throughput (requests per second).
    pub fn throughput(&self, duration_secs: f64) -> f64 {
        if duration_secs <= 0.0 {
            return 0.0;
        }

        self.total_requests as f64 / duration_secs
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let mut metrics = SimulationMetrics::new();

        metrics.record(Outcome::Created, 100);
        metrics.record(Outcome::Replayed, 200);
        metrics.record(Outcome::Created, 150);
        metrics.record(Outcome::Conflict, 50);

        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.created, 2);
        assert_eq!(metrics.replayed, 1);
        assert_eq!(metrics.conflicts, 1);
        assert_eq!(metrics.average_latency_us(), 125);
        assert_eq!(metrics.success_rate(), 0.75);
    }

    #[test]
    fn test_percentiles() {
        let mut metrics = SimulationMetrics::new();
        for latency in 1..=100 {
            metrics.record(Outcome::Created, latency);
        }

        assert_eq!(metrics.p50_latency_us(), 51);
        assert_eq!(metrics.p95_latency_us(), 96);
        assert_eq!(metrics.p99_latency_us(), 100);
        assert_eq!(metrics.throughput(2.0), 50.0);
    }

    #[test]
    fn test_sample_window() {
        let mut metrics = SimulationMetrics::new();
        for _ in 0..10_005 {
            metrics.record(Outcome::Conflict, 7);
        }

        assert_eq!(metrics.total_requests, 10_005);
        assert_eq!(metrics.latency_samples.len(), 10_000);
    }
}
