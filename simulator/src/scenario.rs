//! Simulation scenarios.

use std::path::Path;

use serde::{Deserialize, Serialize};

use seatbook_common::{BookingStatus, PaymentStatus, SeatNumber, Tier};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Wait for a duration.
    Wait { millis: u64 },
    /// Send one booking and check how it ends.
    Book {
        user: String,
        tier: Tier,
        seat: SeatNumber,
        key: String,
        payment: PaymentStatus,
        expect: Expect,
    },
    /// Feed a status for a key straight to the idempotency store.
    Resolve {
        user: String,
        tier: Tier,
        seat: SeatNumber,
        key: String,
        status: BookingStatus,
    },
    /// Concurrent clients each try every seat in the range.
    Rush {
        first_seat: SeatNumber,
        last_seat: SeatNumber,
        clients: usize,
    },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Expected result of a `Book` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expect {
    Created,
    Replayed,
    Conflict,
    Invalid,
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// Seat holds a booking, optionally by a given user.
    SeatBooked { seat: SeatNumber, user: Option<String> },
    /// Seat has no booking.
    SeatFree { seat: SeatNumber },
    /// Tier has exactly this many reserved seats.
    ReservedCount { tier: Tier, count: u32 },
    /// Canonical order for a key has this status.
    Status { key: String, status: BookingStatus },
}

impl Scenario {
    /// Load a built-in scenario by name, or a scenario file ending in `.json`.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        if name.ends_with(".json") {
            return Self::from_file(Path::new(name));
        }

        match name {
            "single-booking" => Ok(Self::single_booking()),
            "double-click" => Ok(Self::double_click()),
            "seat-contention" => Ok(Self::seat_contention()),
            "status-upgrade" => Ok(Self::status_upgrade()),
            "sell-out" => Ok(Self::sell_out()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// One confirmed booking.
    fn single_booking() -> Self {
        Self {
            name: "single-booking".to_string(),
            description: "A confirmed VIP booking holds its seat".to_string(),
            steps: vec![
                book("alice", Tier::Vip, 5, "alice-1", PaymentStatus::Confirmed, Expect::Created),
                ScenarioStep::Assert {
                    condition: AssertCondition::SeatBooked {
                        seat: 5,
                        user: Some("alice".to_string()),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::Status {
                        key: "alice-1".to_string(),
                        status: BookingStatus::Confirmed,
                    },
                },
                book("bob", Tier::Vip, 5, "bob-1", PaymentStatus::Confirmed, Expect::Conflict),
                book("bob", Tier::Vip, 0, "bob-2", PaymentStatus::Confirmed, Expect::Invalid),
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::Vip,
                        count: 1,
                    },
                },
            ],
        }
    }

    /// Retries with the same key collapse onto the first booking.
    fn double_click() -> Self {
        Self {
            name: "double-click".to_string(),
            description: "Repeated submissions with one idempotency key".to_string(),
            steps: vec![
                book("carol", Tier::Ga, 70, "carol-1", PaymentStatus::Confirmed, Expect::Created),
                book("carol", Tier::Ga, 70, "carol-1", PaymentStatus::Confirmed, Expect::Replayed),
                ScenarioStep::Wait { millis: 50 },
                // Same key pointing at a different seat still replays the first seat.
                book("carol", Tier::Ga, 71, "carol-1", PaymentStatus::Confirmed, Expect::Replayed),
                ScenarioStep::Assert {
                    condition: AssertCondition::SeatFree { seat: 71 },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::Ga,
                        count: 1,
                    },
                },
            ],
        }
    }

    /// Many clients race for one seat.
    fn seat_contention() -> Self {
        Self {
            name: "seat-contention".to_string(),
            description: "32 concurrent clients race for seat 9".to_string(),
            steps: vec![
                ScenarioStep::Rush {
                    first_seat: 9,
                    last_seat: 9,
                    clients: 32,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::SeatBooked { seat: 9, user: None },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::Vip,
                        count: 1,
                    },
                },
            ],
        }
    }

    /// A pending order settles and stays settled.
    fn status_upgrade() -> Self {
        Self {
            name: "status-upgrade".to_string(),
            description: "Pending order upgraded to confirmed, never reverted".to_string(),
            steps: vec![
                book("dave", Tier::FrontRow, 40, "dave-1", PaymentStatus::Pending, Expect::Created),
                status("dave-1", BookingStatus::Pending),
                resolve("dave", Tier::FrontRow, 40, "dave-1", BookingStatus::Confirmed),
                status("dave-1", BookingStatus::Confirmed),
                resolve("dave", Tier::FrontRow, 40, "dave-1", BookingStatus::Pending),
                status("dave-1", BookingStatus::Confirmed),
                book("dave", Tier::FrontRow, 40, "dave-1", PaymentStatus::Pending, Expect::Replayed),
            ],
        }
    }

    /// The whole house sells out under load.
    fn sell_out() -> Self {
        Self {
            name: "sell-out".to_string(),
            description: "8 clients race for all 100 seats".to_string(),
            steps: vec![
                ScenarioStep::Rush {
                    first_seat: 1,
                    last_seat: 100,
                    clients: 8,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::Vip,
                        count: 30,
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::FrontRow,
                        count: 30,
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::ReservedCount {
                        tier: Tier::Ga,
                        count: 40,
                    },
                },
                book("late", Tier::Ga, 100, "late-1", PaymentStatus::Confirmed, Expect::Conflict),
            ],
        }
    }
}

fn book(
    user: &str,
    tier: Tier,
    seat: SeatNumber,
    key: &str,
    payment: PaymentStatus,
    expect: Expect,
) -> ScenarioStep {
    ScenarioStep::Book {
        user: user.to_string(),
        tier,
        seat,
        key: key.to_string(),
        payment,
        expect,
    }
}

fn resolve(user: &str, tier: Tier, seat: SeatNumber, key: &str, status: BookingStatus) -> ScenarioStep {
    ScenarioStep::Resolve {
        user: user.to_string(),
        tier,
        seat,
        key: key.to_string(),
        status,
    }
}

fn status(key: &str, status: BookingStatus) -> ScenarioStep {
    ScenarioStep::Assert {
        condition: AssertCondition::Status {
            key: key.to_string(),
            status,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_load() {
        for name in ["single-booking", "double-click", "seat-contention", "status-upgrade", "sell-out"] {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, name);
            assert!(!scenario.steps.is_empty());
        }
        assert!(Scenario::load("nope").is_err());
    }

    #[test]
    fn test_scenario_json_roundtrip_shape() {
        let json = serde_json::to_value(Scenario::double_click()).unwrap();
        assert_eq!(json["steps"][0]["Book"]["tier"], "GA");
        assert_eq!(json["steps"][0]["Book"]["expect"], "Created");
    }
}
