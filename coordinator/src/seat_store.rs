//! Seat ownership store.
//!
//! Holds at most one [`BookingRecord`] per seat for the life of the process.
//! Writers serialize per seat through [`KeyedLocks`]; readers go straight to
//! the concurrent map, whose point reads are safe alongside writes to other
//! seats and whose iteration never yields a torn entry.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use seatbook_common::{
    BookingError, BookingRecord, BookingRequest, Currency, Money, Result, SeatNumber, Tier,
    VenueLayout, BOOKING_NOT_FOUND, INVALID_SEAT_NUMBER, SEAT_ALREADY_BOOKED,
};

use crate::keyed_lock::KeyedLocks;

/// A reserved seat as seen by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub seat: SeatNumber,
    pub tier: Tier,
}

/// Store of seat bookings with per-seat mutual exclusion.
pub struct SeatStore {
    /// Fixed venue layout.
    venue: Arc<VenueLayout>,
    /// Bookings by seat number.
    bookings: DashMap<SeatNumber, BookingRecord>,
    /// One mutex per seat, created on first use.
    seat_locks: KeyedLocks<SeatNumber>,
}

impl SeatStore {
    /// Create an empty store for a venue.
    pub fn new(venue: Arc<VenueLayout>) -> Self {
        Self {
            venue,
            bookings: DashMap::new(),
            seat_locks: KeyedLocks::new("seat"),
        }
    }

    /// The venue this store sells.
    pub fn venue(&self) -> &VenueLayout {
        &self.venue
    }

    /// Claim a seat for a request.
    ///
    /// Fails with `InvalidInput` for seats outside `1..=total_capacity`
    /// (checked before any lock is taken) and with `Conflict` if the seat
    /// already has a booking. The existence check and the insert run under
    /// the seat's mutex, so exactly one of any number of concurrent callers
    /// on the same seat succeeds.
    pub fn register(&self, request: &BookingRequest) -> Result<BookingRecord> {
        let seat = request.seat;
        if !self.venue.contains_seat(seat) {
            return Err(BookingError::invalid_input(INVALID_SEAT_NUMBER));
        }

        self.seat_locks.with_lock(&seat, || {
            if self.bookings.contains_key(&seat) {
                warn!(
                    seat,
                    idempotency_key = %request.idempotency_key,
                    "Seat already booked"
                );
                return Err(BookingError::Conflict(SEAT_ALREADY_BOOKED.to_string()));
            }

            let record = BookingRecord::from_request(request, self.price_for(request.tier, seat));
            self.bookings.insert(seat, record.clone());

            info!(
                booking_id = %record.id,
                seat,
                tier = %record.tier,
                user_id = %record.user_id,
                status = %record.status,
                "Booking registered"
            );

            Ok(record)
        })
    }

    /// Get the booking for a seat.
    pub fn lookup(&self, seat: SeatNumber) -> Result<BookingRecord> {
        self.bookings
            .get(&seat)
            .map(|record| record.clone())
            .ok_or_else(|| BookingError::NotFound(BOOKING_NOT_FOUND.to_string()))
    }

    /// Reserved seats at this instant, in ascending seat order.
    ///
    /// Writers are not blocked while the sweep runs, so a registration that
    /// completes mid-sweep may or may not appear.
    pub fn snapshot(&self) -> Vec<ReservedSeat> {
        let mut seats: Vec<ReservedSeat> = self
            .bookings
            .iter()
            .map(|entry| ReservedSeat {
                seat: *entry.key(),
                tier: entry.value().tier,
            })
            .collect();
        seats.sort_unstable_by_key(|reserved| reserved.seat);
        seats
    }

    /// Copies of every stored record, in ascending seat order.
    pub fn records(&self) -> Vec<BookingRecord> {
        let mut records: Vec<BookingRecord> =
            self.bookings.iter().map(|entry| entry.value().clone()).collect();
        records.sort_unstable_by_key(|record| record.seat);
        records
    }

    /// Number of booked seats.
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    /// Check if no seat is booked.
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Number of seats that have had a mutex created.
    pub fn lock_count(&self) -> usize {
        self.seat_locks.len()
    }

    fn price_for(&self, tier: Tier, seat: SeatNumber) -> Money {
        self.venue
            .spec_for(tier)
            .or_else(|| self.venue.tier_for_seat(seat))
            .map(|spec| spec.unit_price.clone())
            .unwrap_or_else(|| Money::zero(Currency::usd()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use seatbook_common::{BookingStatus, PaymentStatus};
    use std::sync::Barrier;
    use std::thread;

    fn create_test_store() -> SeatStore {
        SeatStore::new(Arc::new(VenueLayout::default()))
    }

    fn request(seat: SeatNumber, key: &str) -> BookingRequest {
        let tier = VenueLayout::default()
            .tier_for_seat(seat)
            .map(|spec| spec.tier)
            .unwrap_or(Tier::Ga);
        BookingRequest::new(format!("user-{key}"), tier, seat, key)
    }

    #[test]
    fn test_register_confirmed_then_conflict() {
        let store = create_test_store();

        let confirmed = request(5, "key-1").with_payment("pay-1", PaymentStatus::Confirmed);
        let record = store.register(&confirmed).unwrap();
        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.seat, 5);
        assert_eq!(record.total_amount.value, dec!(100.00));

        let err = store.register(&request(5, "key-2")).unwrap_err();
        assert_eq!(err, BookingError::Conflict("seat already booked".to_string()));

        // The original booking is untouched.
        assert_eq!(store.lookup(5).unwrap().id, record.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_derives_status() {
        let store = create_test_store();

        let failed = request(40, "key-f").with_payment("pay-f", PaymentStatus::Failed);
        assert_eq!(store.register(&failed).unwrap().status, BookingStatus::Canceled);

        let canceled = request(41, "key-c").with_payment("", PaymentStatus::Canceled);
        assert_eq!(store.register(&canceled).unwrap().status, BookingStatus::Canceled);

        let unpaid = request(42, "key-u").with_payment("", PaymentStatus::Confirmed);
        assert_eq!(store.register(&unpaid).unwrap().status, BookingStatus::Pending);

        let pending = request(43, "key-p");
        assert_eq!(store.register(&pending).unwrap().status, BookingStatus::Pending);
    }

    #[test]
    fn test_seat_bounds() {
        let store = create_test_store();

        for seat in [0, 101, u32::MAX] {
            let err = store.register(&request(seat, "key-bad")).unwrap_err();
            assert_eq!(err, BookingError::InvalidInput("invalid seat number".to_string()));
        }
        // Rejected before any lock is created.
        assert_eq!(store.lock_count(), 0);

        assert!(store.register(&request(1, "key-first")).is_ok());
        assert!(store.register(&request(100, "key-last")).is_ok());
    }

    #[test]
    fn test_lookup_missing_seat() {
        let store = create_test_store();
        let err = store.lookup(15).unwrap_err();
        assert_eq!(err, BookingError::NotFound("booking not found".to_string()));
    }

    #[test]
    fn test_concurrent_register_same_seat() {
        let store = create_test_store();
        let barrier = Barrier::new(32);

        let results: Vec<Result<BookingRecord>> = thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let store = &store;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        store.register(&request(9, &format!("key-{i}")))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 31);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_register_distinct_seats() {
        let store = create_test_store();

        thread::scope(|s| {
            for seat in 1..=100 {
                let store = &store;
                s.spawn(move || {
                    store.register(&request(seat, &format!("key-{seat}"))).unwrap();
                });
            }
        });

        assert_eq!(store.len(), 100);
        assert_eq!(store.lock_count(), 100);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = create_test_store();
        for seat in [70, 3, 45] {
            store.register(&request(seat, &format!("key-{seat}"))).unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot,
            vec![
                ReservedSeat { seat: 3, tier: Tier::Vip },
                ReservedSeat { seat: 45, tier: Tier::FrontRow },
                ReservedSeat { seat: 70, tier: Tier::Ga },
            ]
        );
        let seats: Vec<SeatNumber> = store.records().iter().map(|r| r.seat).collect();
        assert_eq!(seats, vec![3, 45, 70]);
    }
}
