//! Error types for Seatbook operations.

use thiserror::Error;

/// Message reported when a seat number falls outside the venue.
pub const INVALID_SEAT_NUMBER: &str = "invalid seat number";
/// Message reported when the seat already has a booking.
pub const SEAT_ALREADY_BOOKED: &str = "seat already booked";
/// Message reported when no booking exists for a seat.
pub const BOOKING_NOT_FOUND: &str = "booking not found";

/// Main error type for Seatbook operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed or out-of-range request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The seat is already owned by another booking.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Coordinator is not accepting bookings.
    #[error("Booking service unavailable, retry after {retry_after_ms}ms")]
    Unavailable { retry_after_ms: u64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BookingError {
    /// Build an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BookingError::InvalidInput(message.into())
    }

    /// Build a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        BookingError::Configuration(message.into())
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Unavailable { .. })
    }

    /// Get suggested retry delay in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            BookingError::Unavailable { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::InvalidInput(_) => "INVALID_INPUT",
            BookingError::Conflict(_) => "CONFLICT",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::Unavailable { .. } => "UNAVAILABLE",
            BookingError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// The bare message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            BookingError::InvalidInput(m)
            | BookingError::Conflict(m)
            | BookingError::NotFound(m)
            | BookingError::Configuration(m) => m.clone(),
            BookingError::Unavailable { .. } => self.to_string(),
        }
    }
}

/// Result type alias for Seatbook operations.
pub type Result<T> = std::result::Result<T, BookingError>;
