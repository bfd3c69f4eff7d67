//! Seat tiers and the fixed venue layout.
//!
//! A venue is a dense block of seats `1..=total_capacity`. Each tier owns one
//! contiguous, non-overlapping range of that block and a fixed unit price.
//! The layout is built once at startup and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::{BookingError, Currency, Money, Result, SeatNumber};

/// Largest venue a layout may describe. Availability sweeps every seat.
pub const MAX_VENUE_CAPACITY: u32 = 1_000_000;

/// A named class of seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Premium seating.
    Vip,
    /// Mid-priced seating near the stage.
    FrontRow,
    /// General admission.
    Ga,
}

impl Tier {
    /// All tiers in display order.
    pub const ALL: [Tier; 3] = [Tier::Vip, Tier::FrontRow, Tier::Ga];

    /// Wire name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Vip => "VIP",
            Tier::FrontRow => "FRONT_ROW",
            Tier::Ga => "GA",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIP" => Ok(Tier::Vip),
            "FRONT_ROW" => Ok(Tier::FrontRow),
            "GA" => Ok(Tier::Ga),
            other => Err(BookingError::invalid_input(format!("invalid tier: {other}"))),
        }
    }
}

/// Seat range and price of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// The tier.
    pub tier: Tier,
    /// First seat of the range (inclusive).
    pub first_seat: SeatNumber,
    /// Last seat of the range (inclusive).
    pub last_seat: SeatNumber,
    /// Price of a single seat.
    pub unit_price: Money,
}

impl TierSpec {
    /// Create a tier specification.
    pub fn new(tier: Tier, seats: RangeInclusive<SeatNumber>, unit_price: Money) -> Self {
        Self {
            tier,
            first_seat: *seats.start(),
            last_seat: *seats.end(),
            unit_price,
        }
    }

    /// The seat range.
    pub fn seats(&self) -> RangeInclusive<SeatNumber> {
        self.first_seat..=self.last_seat
    }

    /// Number of seats in the tier.
    pub fn capacity(&self) -> u32 {
        if self.last_seat < self.first_seat {
            0
        } else {
            self.last_seat - self.first_seat + 1
        }
    }

    /// Check if a seat falls within this tier.
    pub fn contains(&self, seat: SeatNumber) -> bool {
        self.seats().contains(&seat)
    }
}

/// The complete, immutable seating plan of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueLayout {
    tiers: Vec<TierSpec>,
    total_capacity: u32,
}

impl VenueLayout {
    /// Build and validate a layout.
    pub fn new(tiers: Vec<TierSpec>, total_capacity: u32) -> Result<Self> {
        let layout = Self {
            tiers,
            total_capacity,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Tiers in the order they were declared.
    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    /// Highest valid seat number.
    pub fn total_capacity(&self) -> u32 {
        self.total_capacity
    }

    /// Check if a seat number exists in the venue.
    pub fn contains_seat(&self, seat: SeatNumber) -> bool {
        seat >= 1 && seat <= self.total_capacity
    }

    /// The tier a seat belongs to, if any.
    pub fn tier_for_seat(&self, seat: SeatNumber) -> Option<&TierSpec> {
        self.tiers.iter().find(|spec| spec.contains(seat))
    }

    /// Specification of a tier, if the venue sells it.
    pub fn spec_for(&self, tier: Tier) -> Option<&TierSpec> {
        self.tiers.iter().find(|spec| spec.tier == tier)
    }

    /// Validate the layout.
    pub fn validate(&self) -> Result<()> {
        if self.total_capacity == 0 {
            return Err(BookingError::configuration("total capacity must be positive"));
        }

        if self.total_capacity > MAX_VENUE_CAPACITY {
            return Err(BookingError::configuration(format!(
                "total capacity {} exceeds the limit of {MAX_VENUE_CAPACITY} seats",
                self.total_capacity
            )));
        }

        if self.tiers.is_empty() {
            return Err(BookingError::configuration("at least one tier is required"));
        }

        for spec in &self.tiers {
            if spec.first_seat == 0 || spec.first_seat > spec.last_seat {
                return Err(BookingError::configuration(format!(
                    "tier {} has an invalid seat range {}-{}",
                    spec.tier, spec.first_seat, spec.last_seat
                )));
            }
            if spec.last_seat > self.total_capacity {
                return Err(BookingError::configuration(format!(
                    "tier {} ends at seat {} beyond capacity {}",
                    spec.tier, spec.last_seat, self.total_capacity
                )));
            }
            if !spec.unit_price.is_positive() {
                return Err(BookingError::configuration(format!(
                    "tier {} must have a positive price",
                    spec.tier
                )));
            }
        }

        let mut sorted: Vec<&TierSpec> = self.tiers.iter().collect();
        sorted.sort_by_key(|spec| spec.first_seat);
        for pair in sorted.windows(2) {
            if pair[0].last_seat >= pair[1].first_seat {
                return Err(BookingError::configuration(format!(
                    "tiers {} and {} overlap",
                    pair[0].tier, pair[1].tier
                )));
            }
        }

        let mut seen: Vec<Tier> = self.tiers.iter().map(|spec| spec.tier).collect();
        seen.sort();
        seen.dedup();
        if seen.len() != self.tiers.len() {
            return Err(BookingError::configuration("duplicate tier in layout"));
        }

        Ok(())
    }

    /// Parse the textual layout form used in configuration.
    ///
    /// Entries are comma separated, each `TIER:FIRST-LAST:PRICE[:CURRENCY]`.
    /// An optional `capacity=N` entry sets the capacity explicitly; otherwise
    /// it is the highest last seat of any tier.
    ///
    /// ```
    /// use seatbook_common::VenueLayout;
    ///
    /// let layout = VenueLayout::parse("VIP:1-10:80.00,GA:11-50:15.00").unwrap();
    /// assert_eq!(layout.total_capacity(), 50);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let mut tiers = Vec::new();
        let mut capacity = None;

        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if let Some(value) = entry.strip_prefix("capacity=") {
                let parsed = value.trim().parse::<u32>().map_err(|_| {
                    BookingError::configuration(format!("invalid capacity: {value}"))
                })?;
                capacity = Some(parsed);
                continue;
            }

            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            if parts.len() < 3 || parts.len() > 4 {
                return Err(BookingError::configuration(format!(
                    "invalid tier entry: {entry}"
                )));
            }

            let tier = parts[0]
                .parse::<Tier>()
                .map_err(|e| BookingError::configuration(e.message()))?;

            let (first, last) = parts[1].split_once('-').ok_or_else(|| {
                BookingError::configuration(format!("invalid seat range: {}", parts[1]))
            })?;
            let first = parse_seat(first)?;
            let last = parse_seat(last)?;

            let currency = parts.get(3).map(|c| Currency::new(*c)).unwrap_or_default();
            let price = Money::from_str(parts[2], currency).map_err(|_| {
                BookingError::configuration(format!("invalid price: {}", parts[2]))
            })?;

            tiers.push(TierSpec::new(tier, first..=last, price));
        }

        let total_capacity =
            capacity.unwrap_or_else(|| tiers.iter().map(|t| t.last_seat).max().unwrap_or(0));
        Self::new(tiers, total_capacity)
    }
}

fn parse_seat(value: &str) -> Result<SeatNumber> {
    value
        .trim()
        .parse()
        .map_err(|_| BookingError::configuration(format!("invalid seat number: {value}")))
}

impl Default for VenueLayout {
    /// 100 seats: VIP 1-30 at $100, FRONT_ROW 31-60 at $50, GA 61-100 at $10.
    fn default() -> Self {
        let usd = |cents: i64| Money::new(rust_decimal::Decimal::new(cents, 2), Currency::usd());
        Self {
            tiers: vec![
                TierSpec::new(Tier::Vip, 1..=30, usd(10_000)),
                TierSpec::new(Tier::FrontRow, 31..=60, usd(5_000)),
                TierSpec::new(Tier::Ga, 61..=100, usd(1_000)),
            ],
            total_capacity: 100,
        }
    }
}
