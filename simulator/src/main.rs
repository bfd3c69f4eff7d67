//! Seatbook Simulator
//!
//! Drives concurrent booking traffic and scripted scenarios against an
//! in-process coordinator, then checks the booking invariants.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seatbook_common::{BookingStatus, VenueLayout};
use seatbook_coordinator::{Coordinator, CoordinatorConfig};

mod client;
mod controller;
mod metrics;
mod scenario;

use controller::{LoadProfile, SimulationController};
use scenario::Scenario;

/// Seatbook Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Seatbook load and scenario simulator")]
struct Args {
    /// Number of concurrent clients
    #[arg(short, long, default_value = "8")]
    clients: usize,

    /// Bookings issued by each client
    #[arg(short, long, default_value = "50")]
    requests: usize,

    /// Share of bookings re-sent with the same idempotency key
    #[arg(long, default_value = "0.2")]
    retry_ratio: f64,

    /// Share of bookings carrying a failed payment
    #[arg(long, default_value = "0.1")]
    payment_failure_ratio: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Scenario to run (built-in name or path to a .json file)
    #[arg(short, long)]
    scenario: Option<String>,

    /// Venue layout, e.g. "VIP:1-30:100.00,GA:31-100:10.00"
    #[arg(long)]
    venue: Option<String>,

    /// Print the final availability report as JSON
    #[arg(long)]
    report_json: bool,

    /// Print coordinator counters in Prometheus text format
    #[arg(long)]
    prometheus: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CoordinatorConfig::from_env()?;
    if let Some(layout) = &args.venue {
        config.venue = VenueLayout::parse(layout)?;
    }

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting Seatbook Simulator");
    info!("Venue capacity: {}", config.venue.total_capacity());

    let coordinator = Arc::new(Coordinator::new(config));
    coordinator.start()?;

    let mut controller = SimulationController::new(
        coordinator.clone(),
        LoadProfile {
            clients: args.clients,
            requests_per_client: args.requests,
            retry_ratio: args.retry_ratio,
            payment_failure_ratio: args.payment_failure_ratio,
            seed: args.seed,
        },
    );

    if let Some(scenario_name) = &args.scenario {
        info!("Running scenario: {}", scenario_name);

        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(scenario).await?;
    } else {
        info!("Clients: {}", args.clients);
        controller.run().await?;
    }

    coordinator.stop();

    // Print metrics
    let metrics = controller.metrics().await;
    let elapsed = controller.elapsed().as_secs_f64();
    info!("Simulation complete");
    info!("Total requests: {}", metrics.total_requests);
    info!("Created: {}", metrics.created);
    info!("Replayed: {}", metrics.replayed);
    info!("Conflicts: {}", metrics.conflicts);
    info!("Rejected: {}", metrics.rejected);
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    info!("Throughput: {:.0} req/s", metrics.throughput(elapsed));
    info!(
        "Latency: avg {}µs, p50 {}µs, p95 {}µs, p99 {}µs",
        metrics.average_latency_us(),
        metrics.p50_latency_us(),
        metrics.p95_latency_us(),
        metrics.p99_latency_us()
    );

    let report = coordinator.availability();
    for tier in &report.tiers {
        info!(
            "{}: {} reserved, {} available",
            tier.tier,
            tier.reserved_count,
            tier.available_count()
        );
    }

    let mut confirmed = coordinator
        .seat_store()
        .records()
        .into_iter()
        .filter(|record| record.status == BookingStatus::Confirmed)
        .map(|record| record.total_amount);
    if let Some(first) = confirmed.next() {
        match confirmed.try_fold(first, |sum, amount| sum.checked_add(&amount)) {
            Some(revenue) => info!("Confirmed revenue: {}", revenue),
            None => warn!("Tier prices use mixed currencies, revenue not summed"),
        }
    }

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if args.prometheus && coordinator.config().metrics_enabled {
        print!("{}", coordinator.metrics().to_prometheus());
    }

    Ok(())
}
