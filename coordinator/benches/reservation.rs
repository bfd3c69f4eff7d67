//! Reservation core benchmarks.
//!
//! - Seat registration: uncontended and spread over threads
//! - Idempotency resolve: new keys and repeated keys
//! - Availability aggregation over a half-full house
//!
//! Run with: `cargo bench --bench reservation`

#![allow(missing_docs)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use seatbook_common::{
    BookingRequest, BookingStatus, Currency, Money, PaymentStatus, Tier, TierSpec, VenueLayout,
};
use seatbook_coordinator::{aggregate, IdempotencyStore, SeatStore};

const LARGE_VENUE: u32 = 100_000;

fn large_venue() -> Arc<VenueLayout> {
    let tiers = vec![
        TierSpec::new(Tier::Vip, 1..=10_000, Money::from_str("100.00", Currency::usd()).expect("price")),
        TierSpec::new(Tier::FrontRow, 10_001..=40_000, Money::from_str("50.00", Currency::usd()).expect("price")),
        TierSpec::new(Tier::Ga, 40_001..=LARGE_VENUE, Money::from_str("10.00", Currency::usd()).expect("price")),
    ];
    Arc::new(VenueLayout::new(tiers, LARGE_VENUE).expect("layout"))
}

fn request(venue: &VenueLayout, seat: u32, key: String) -> BookingRequest {
    let tier = venue.tier_for_seat(seat).expect("seat in venue").tier;
    BookingRequest::new("bench-user", tier, seat, key).with_payment("pay", PaymentStatus::Confirmed)
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("register");
    group.throughput(Throughput::Elements(1));

    group.bench_function("uncontended", |b| {
        let venue = large_venue();
        let mut seat = 0u32;
        let mut store = SeatStore::new(venue.clone());
        b.iter(|| {
            seat += 1;
            if seat > LARGE_VENUE {
                seat = 1;
                store = SeatStore::new(venue.clone());
            }
            black_box(store.register(&request(&venue, seat, format!("k{seat}"))))
        });
    });

    group.bench_function("conflict", |b| {
        let venue = large_venue();
        let store = SeatStore::new(venue.clone());
        store
            .register(&request(&venue, 1, "winner".to_string()))
            .expect("first booking");
        let loser = request(&venue, 1, "loser".to_string());
        b.iter(|| black_box(store.register(&loser)));
    });

    group.finish();
}

fn bench_register_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("register_parallel");

    for threads in [2usize, 4, 8] {
        let per_thread = 1_000u32;
        group.throughput(Throughput::Elements(u64::from(per_thread) * threads as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let venue = large_venue();
            b.iter(|| {
                let store = SeatStore::new(venue.clone());
                thread::scope(|s| {
                    for t in 0..threads as u32 {
                        let store = &store;
                        let venue = &venue;
                        s.spawn(move || {
                            // Neighbouring threads overlap on half their seats.
                            let start = t * per_thread / 2 + 1;
                            for seat in start..start + per_thread {
                                let _ = store.register(&request(venue, seat, format!("t{t}-{seat}")));
                            }
                        });
                    }
                });
                black_box(store.len())
            });
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new_key", |b| {
        let store = IdempotencyStore::new();
        let counter = AtomicU64::new(0);
        b.iter(|| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            black_box(store.resolve(BookingRequest::new("u", Tier::Ga, 70, format!("k{n}"))))
        });
    });

    group.bench_function("existing_key", |b| {
        let store = IdempotencyStore::new();
        store.resolve(BookingRequest::new("u", Tier::Ga, 70, "same"));
        let retry = BookingRequest::new("u", Tier::Ga, 70, "same").with_status(BookingStatus::Confirmed);
        b.iter(|| black_box(store.resolve(retry.clone())));
    });

    group.finish();
}

fn bench_availability(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability");

    let default_venue = Arc::new(VenueLayout::default());
    for (name, venue) in [("default", default_venue), ("large", large_venue())] {
        let store = SeatStore::new(venue.clone());
        for seat in (1..=venue.total_capacity()).step_by(2) {
            store
                .register(&request(&venue, seat, format!("k{seat}")))
                .expect("free seat");
        }

        group.throughput(Throughput::Elements(u64::from(venue.total_capacity())));
        group.bench_function(name, |b| {
            b.iter(|| black_box(aggregate(&venue, &store.snapshot())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_register,
    bench_register_parallel,
    bench_resolve,
    bench_availability
);
criterion_main!(benches);
