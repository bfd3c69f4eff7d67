//! Per-tier availability derived from a seat store snapshot.

use serde::{Deserialize, Serialize};

use seatbook_common::{now, Money, SeatNumber, Tier, Timestamp, VenueLayout};

use crate::seat_store::ReservedSeat;

/// Reserved and free seats of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierAvailability {
    pub tier: Tier,
    pub unit_price: Money,
    pub total_seats: u32,
    pub reserved_count: u32,
    /// Reserved seats, ascending.
    pub reserved: Vec<SeatNumber>,
    /// Free seats, ascending.
    pub available: Vec<SeatNumber>,
}

impl TierAvailability {
    /// Number of free seats.
    pub fn available_count(&self) -> u32 {
        self.available.len() as u32
    }

    /// Check if the tier has no free seat left.
    pub fn is_sold_out(&self) -> bool {
        self.available.is_empty()
    }
}

/// Availability of every tier at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub tiers: Vec<TierAvailability>,
    pub generated_at: Timestamp,
}

impl AvailabilityReport {
    /// Availability of a single tier.
    pub fn tier(&self, tier: Tier) -> Option<&TierAvailability> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// Total reserved seats across tiers.
    pub fn reserved_total(&self) -> u32 {
        self.tiers.iter().map(|t| t.reserved_count).sum()
    }

    /// Total free seats across tiers.
    pub fn available_total(&self) -> u32 {
        self.tiers.iter().map(TierAvailability::available_count).sum()
    }
}

/// Partition each tier's seat range into reserved and available seats.
///
/// A seat counts as reserved for the tier whose range contains it, whatever
/// tier its booking recorded, so `reserved + available` always equals the
/// tier's capacity. Runs in O(total capacity).
pub fn aggregate(venue: &VenueLayout, snapshot: &[ReservedSeat]) -> AvailabilityReport {
    let capacity = venue.total_capacity() as usize;
    let mut taken = vec![false; capacity + 1];
    for reserved in snapshot {
        if let Some(slot) = taken.get_mut(reserved.seat as usize) {
            *slot = true;
        }
    }

    let tiers = venue
        .tiers()
        .iter()
        .map(|spec| {
            let (reserved, available): (Vec<SeatNumber>, Vec<SeatNumber>) =
                spec.seats()
                    .partition(|seat| taken.get(*seat as usize).copied().unwrap_or(false));
            TierAvailability {
                tier: spec.tier,
                unit_price: spec.unit_price.clone(),
                total_seats: spec.capacity(),
                reserved_count: reserved.len() as u32,
                reserved,
                available,
            }
        })
        .collect();

    AvailabilityReport {
        tiers,
        generated_at: now(),
    }
}
