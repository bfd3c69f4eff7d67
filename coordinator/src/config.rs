//! Coordinator configuration.

use std::time::Duration;

use seatbook_common::{BookingError, Result, VenueLayout};

/// Main coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Node ID used in logs.
    pub node_id: Option<String>,
    /// Fixed seating plan.
    pub venue: VenueLayout,
    /// Enable metrics collection.
    pub metrics_enabled: bool,
    /// How long `stop` waits for in-flight bookings.
    pub drain_timeout: Duration,
    /// Retry hint returned while the coordinator is not running.
    pub unavailable_retry_after: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            venue: VenueLayout::default(),
            metrics_enabled: true,
            drain_timeout: Duration::from_secs(5),
            unavailable_retry_after: Duration::from_millis(1000),
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    ///
    /// A venue layout that fails to parse is an error; other unparsable
    /// values keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(node_id) = lookup("SEATBOOK_NODE_ID") {
            config.node_id = Some(node_id);
        }

        if let Some(layout) = lookup("SEATBOOK_VENUE_LAYOUT") {
            config.venue = VenueLayout::parse(&layout)?;
        }

        if let Some(enabled) = lookup("SEATBOOK_METRICS_ENABLED") {
            if let Ok(enabled) = enabled.parse() {
                config.metrics_enabled = enabled;
            }
        }

        if let Some(millis) = lookup("SEATBOOK_DRAIN_TIMEOUT_MS") {
            if let Ok(millis) = millis.parse() {
                config.drain_timeout = Duration::from_millis(millis);
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.venue.validate()?;

        if self.log_level.trim().is_empty() {
            return Err(BookingError::configuration("log level cannot be empty"));
        }

        Ok(())
    }
}
