//! Idempotency-key deduplication.
//!
//! The first order seen for a key becomes the canonical order for that key
//! for the life of the process. Later orders with the same key never change
//! its identity fields; they may only advance its status out of pending.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use seatbook_common::{BookingRequest, BookingStatus, IdempotencyKey};

use crate::keyed_lock::KeyedLocks;

/// Store of canonical orders keyed by idempotency key.
pub struct IdempotencyStore {
    /// Canonical order per key.
    orders: DashMap<IdempotencyKey, BookingRequest>,
    /// One mutex per key, created on first use.
    key_locks: KeyedLocks<IdempotencyKey>,
}

impl IdempotencyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            key_locks: KeyedLocks::new("idempotency_key"),
        }
    }

    /// Collapse an order onto the canonical order for its key.
    ///
    /// With no stored order, `order` is stored verbatim and returned. With a
    /// stored order, a settled incoming status (confirmed or canceled) is
    /// applied to the stored order if the status machine allows it; a pending
    /// incoming status leaves the stored order untouched. The stored order is
    /// returned either way. Never fails.
    pub fn resolve(&self, order: BookingRequest) -> BookingRequest {
        let key = order.idempotency_key.clone();

        self.key_locks.with_lock(&key, || match self.orders.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                debug!(idempotency_key = %key, seat = order.seat, "Canonical order stored");
                vacant.insert(order.clone());
                order
            }
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                let incoming = order.status;

                if incoming != BookingStatus::Pending && incoming != stored.status {
                    if stored.status.can_transition_to(incoming) {
                        info!(
                            idempotency_key = %key,
                            seat = stored.seat,
                            from = %stored.status,
                            to = %incoming,
                            "Canonical order status advanced"
                        );
                        stored.status = incoming;
                    } else {
                        warn!(
                            idempotency_key = %key,
                            current = %stored.status,
                            requested = %incoming,
                            "Ignoring status change on settled order"
                        );
                    }
                } else {
                    debug!(idempotency_key = %key, "Replayed canonical order");
                }

                stored.clone()
            }
        })
    }

    /// Get the canonical order for a key.
    pub fn get(&self, key: &IdempotencyKey) -> Option<BookingRequest> {
        self.orders.get(key).map(|order| order.clone())
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if no key has been seen.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatbook_common::{PaymentStatus, Tier};
    use std::sync::Barrier;
    use std::thread;

    fn order(key: &str, seat: u32, status: BookingStatus) -> BookingRequest {
        BookingRequest::new("user-1", Tier::Vip, seat, key).with_status(status)
    }

    #[test]
    fn test_first_order_is_stored_verbatim() {
        let store = IdempotencyStore::new();
        let first = order("k1", 7, BookingStatus::Pending)
            .with_payment("pay-1", PaymentStatus::Pending);

        assert_eq!(store.resolve(first.clone()), first);
        assert_eq!(store.get(&"k1".into()), Some(first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_status_upgrade_keeps_identity() {
        let store = IdempotencyStore::new();

        let first = store.resolve(order("k1", 7, BookingStatus::Pending));
        assert_eq!(first.seat, 7);
        assert_eq!(first.status, BookingStatus::Pending);

        // Same key, different seat and a settled status.
        let second = store.resolve(order("k1", 12, BookingStatus::Confirmed));
        assert_eq!(second.seat, 7);
        assert_eq!(second.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_status_never_reverts_to_pending() {
        let store = IdempotencyStore::new();

        let statuses: Vec<BookingStatus> = [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Pending,
        ]
        .into_iter()
        .map(|status| store.resolve(order("k3", 3, status)).status)
        .collect();

        assert_eq!(
            statuses,
            vec![
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Confirmed
            ]
        );
    }

    #[test]
    fn test_settled_order_is_final() {
        let store = IdempotencyStore::new();
        store.resolve(order("k4", 4, BookingStatus::Pending));
        store.resolve(order("k4", 4, BookingStatus::Canceled));

        let after = store.resolve(order("k4", 4, BookingStatus::Confirmed));
        assert_eq!(after.status, BookingStatus::Canceled);
    }

    #[test]
    fn test_first_order_may_already_be_settled() {
        let store = IdempotencyStore::new();
        let stored = store.resolve(order("k5", 5, BookingStatus::Confirmed));
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = IdempotencyStore::new();
        store.resolve(order("a", 1, BookingStatus::Pending));
        store.resolve(order("b", 2, BookingStatus::Confirmed));

        assert_eq!(store.get(&"a".into()).unwrap().status, BookingStatus::Pending);
        assert_eq!(store.get(&"b".into()).unwrap().seat, 2);
        assert!(store.get(&"c".into()).is_none());
    }

    #[test]
    fn test_concurrent_resolve_converges() {
        let store = IdempotencyStore::new();
        let barrier = Barrier::new(24);

        let inputs: Vec<BookingRequest> = (0..24)
            .map(|i| {
                BookingRequest::new(format!("user-{i}"), Tier::Ga, 61 + i, "shared")
            })
            .collect();

        let results: Vec<BookingRequest> = thread::scope(|s| {
            let handles: Vec<_> = inputs
                .iter()
                .cloned()
                .map(|input| {
                    let store = &store;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        store.resolve(input)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winner = &results[0];
        assert!(results.iter().all(|r| r == winner));
        assert_eq!(inputs.iter().filter(|input| *input == winner).count(), 1);
        assert_eq!(store.len(), 1);
    }
}
