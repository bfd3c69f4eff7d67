//! Property-based tests for store invariants.
//!
//! These tests use proptest to check that the idempotency and availability
//! invariants hold across randomly generated request sets.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use seatbook_common::{BookingRequest, BookingStatus, PaymentStatus, Tier, VenueLayout};
use seatbook_coordinator::{aggregate, IdempotencyStore, SeatStore};

fn arb_tier() -> impl Strategy<Value = Tier> {
    prop::sample::select(Tier::ALL.to_vec())
}

fn arb_status() -> impl Strategy<Value = BookingStatus> {
    prop::sample::select(vec![
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Canceled,
    ])
}

fn arb_payment() -> impl Strategy<Value = PaymentStatus> {
    prop::sample::select(vec![
        PaymentStatus::Pending,
        PaymentStatus::Confirmed,
        PaymentStatus::Failed,
        PaymentStatus::Canceled,
    ])
}

/// Generates an order with arbitrary payload but a fixed key.
fn arb_order(key: &'static str) -> impl Strategy<Value = BookingRequest> {
    ("[a-z]{1,8}", arb_tier(), 1u32..=100, arb_status()).prop_map(
        move |(user, tier, seat, status)| {
            BookingRequest::new(user, tier, seat, key).with_status(status)
        },
    )
}

proptest! {
    #[test]
    fn resolve_keeps_first_identity(orders in prop::collection::vec(arb_order("k"), 1..20)) {
        let store = IdempotencyStore::new();
        let first = orders[0].clone();

        let mut previous = BookingStatus::Pending;
        for (i, order) in orders.into_iter().enumerate() {
            let canonical = store.resolve(order);

            prop_assert_eq!(&canonical.user_id, &first.user_id);
            prop_assert_eq!(canonical.seat, first.seat);
            prop_assert_eq!(canonical.tier, first.tier);

            // Status only moves forward, and never leaves a settled state.
            if i > 0 {
                prop_assert!(
                    canonical.status == previous || previous.can_transition_to(canonical.status)
                );
                if previous.is_final() {
                    prop_assert_eq!(canonical.status, previous);
                }
            }
            previous = canonical.status;
        }
    }

    #[test]
    fn availability_partitions_capacity(
        attempts in prop::collection::vec((1u32..=100, arb_payment()), 0..150)
    ) {
        let venue = Arc::new(VenueLayout::default());
        let store = SeatStore::new(venue.clone());

        for (i, (seat, payment)) in attempts.iter().enumerate() {
            let tier = venue.tier_for_seat(*seat).unwrap().tier;
            let request = BookingRequest::new("u", tier, *seat, format!("k{i}"))
                .with_payment("pay", *payment);
            let _ = store.register(&request);
        }

        let booked: HashSet<u32> = store.records().iter().map(|r| r.seat).collect();
        let distinct: HashSet<u32> = attempts.iter().map(|(seat, _)| *seat).collect();
        prop_assert_eq!(&booked, &distinct);

        let report = aggregate(&venue, &store.snapshot());
        for tier in &report.tiers {
            prop_assert_eq!(tier.reserved_count + tier.available_count(), tier.total_seats);
            prop_assert!(tier.available.iter().all(|seat| !booked.contains(seat)));
            prop_assert!(tier.available.windows(2).all(|w| w[0] < w[1]));
        }
        prop_assert_eq!(report.reserved_total() as usize, booked.len());
    }

    #[test]
    fn out_of_range_seats_never_lock(seat in prop_oneof![Just(0u32), 101u32..]) {
        let store = SeatStore::new(Arc::new(VenueLayout::default()));
        prop_assert!(store.register(&BookingRequest::new("u", Tier::Ga, seat, "k")).is_err());
        prop_assert_eq!(store.lock_count(), 0);
    }
}
