//! Booking types and status rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::{now, Timestamp};
use crate::{BookingId, Currency, IdempotencyKey, Money, PaymentId, SeatNumber, Tier, UserId};

/// Outcome reported by the external payment processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment not yet settled.
    #[default]
    Pending,
    /// Payment captured.
    Confirmed,
    /// Payment declined or errored.
    Failed,
    /// Payment withdrawn by the user.
    Canceled,
}

/// Booking status representing the lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Seat held, payment outcome unknown.
    #[default]
    Pending,
    /// Seat held and paid for.
    Confirmed,
    /// Payment failed or was canceled.
    Canceled,
}

impl BookingStatus {
    /// Derive the settled status of a booking from its payment fields.
    ///
    /// A booking is confirmed only with a payment reference and a confirmed
    /// payment; a failed or canceled payment cancels it; anything else stays
    /// pending.
    pub fn from_payment(payment_id: &PaymentId, payment_status: PaymentStatus) -> Self {
        match payment_status {
            PaymentStatus::Confirmed if !payment_id.is_empty() => BookingStatus::Confirmed,
            PaymentStatus::Failed | PaymentStatus::Canceled => BookingStatus::Canceled,
            _ => BookingStatus::Pending,
        }
    }

    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Canceled)
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Canceled],
            BookingStatus::Confirmed => &[],
            BookingStatus::Canceled => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Canceled => "CANCELED",
        };
        f.write_str(name)
    }
}

/// A booking intent submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// User placing the booking.
    pub user_id: UserId,
    /// Requested tier.
    pub tier: Tier,
    /// Requested seat.
    pub seat: SeatNumber,
    /// Billing country.
    #[serde(default)]
    pub country: String,
    /// Billing postal code.
    #[serde(default)]
    pub zip_code: String,
    /// Billing currency.
    #[serde(default)]
    pub currency: Currency,
    /// Retry token.
    pub idempotency_key: IdempotencyKey,
    /// External payment reference.
    #[serde(default)]
    pub payment_id: PaymentId,
    /// External payment outcome.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Order status, advanced by the idempotency store once settled.
    #[serde(default)]
    pub status: BookingStatus,
}

impl BookingRequest {
    /// Create a pending request with empty billing and payment fields.
    pub fn new(
        user_id: impl Into<UserId>,
        tier: Tier,
        seat: SeatNumber,
        idempotency_key: impl Into<IdempotencyKey>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tier,
            seat,
            country: String::new(),
            zip_code: String::new(),
            currency: Currency::default(),
            idempotency_key: idempotency_key.into(),
            payment_id: PaymentId::default(),
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Pending,
        }
    }

    /// Attach the payment reference and outcome.
    pub fn with_payment(mut self, payment_id: impl Into<PaymentId>, status: PaymentStatus) -> Self {
        self.payment_id = payment_id.into();
        self.payment_status = status;
        self
    }

    /// Attach billing locale fields.
    pub fn with_locale(
        mut self,
        country: impl Into<String>,
        zip_code: impl Into<String>,
        currency: Currency,
    ) -> Self {
        self.country = country.into();
        self.zip_code = zip_code.into();
        self.currency = currency;
        self
    }

    /// Set the order status.
    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = status;
        self
    }

    /// Status this request would settle to if registered now.
    pub fn derived_status(&self) -> BookingStatus {
        BookingStatus::from_payment(&self.payment_id, self.payment_status)
    }
}

/// A booking accepted by the seat store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    /// Server-generated identifier.
    pub id: BookingId,
    pub user_id: UserId,
    pub tier: Tier,
    pub seat: SeatNumber,
    pub country: String,
    pub zip_code: String,
    pub currency: Currency,
    pub idempotency_key: IdempotencyKey,
    pub payment_id: PaymentId,
    pub payment_status: PaymentStatus,
    /// Amount charged for the seat.
    pub total_amount: Money,
    /// Status derived from the payment fields at creation.
    pub status: BookingStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BookingRecord {
    /// Create a record from an accepted request.
    pub fn from_request(request: &BookingRequest, total_amount: Money) -> Self {
        let created_at = now();
        Self {
            id: BookingId::new(),
            user_id: request.user_id.clone(),
            tier: request.tier,
            seat: request.seat,
            country: request.country.clone(),
            zip_code: request.zip_code.clone(),
            currency: request.currency.clone(),
            idempotency_key: request.idempotency_key.clone(),
            payment_id: request.payment_id.clone(),
            payment_status: request.payment_status,
            total_amount,
            status: request.derived_status(),
            created_at,
            updated_at: created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_derivation() {
        let paid = PaymentId::new("pay-1");
        let none = PaymentId::default();

        assert_eq!(
            BookingStatus::from_payment(&paid, PaymentStatus::Confirmed),
            BookingStatus::Confirmed
        );
        // A confirmed outcome without a reference does not confirm.
        assert_eq!(
            BookingStatus::from_payment(&none, PaymentStatus::Confirmed),
            BookingStatus::Pending
        );
        // Any reference counts, even one the request validator would call blank.
        assert_eq!(
            BookingStatus::from_payment(&PaymentId::new("  "), PaymentStatus::Confirmed),
            BookingStatus::Confirmed
        );
        assert_eq!(
            BookingStatus::from_payment(&paid, PaymentStatus::Failed),
            BookingStatus::Canceled
        );
        assert_eq!(
            BookingStatus::from_payment(&none, PaymentStatus::Canceled),
            BookingStatus::Canceled
        );
        assert_eq!(
            BookingStatus::from_payment(&paid, PaymentStatus::Pending),
            BookingStatus::Pending
        );
    }

    #[test]
    fn test_valid_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Canceled));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Canceled));
        assert!(!BookingStatus::Canceled.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_final_states() {
        assert!(BookingStatus::Confirmed.is_final());
        assert!(BookingStatus::Canceled.is_final());
        assert!(!BookingStatus::Pending.is_final());
    }

    #[test]
    fn test_record_copies_request() {
        let request = BookingRequest::new("user-1", Tier::Vip, 5, "key-1")
            .with_locale("USA", "10001", Currency::usd())
            .with_payment("pay-1", PaymentStatus::Confirmed);
        let record = BookingRecord::from_request(&request, Money::new(dec!(100), Currency::usd()));

        assert_eq!(record.seat, 5);
        assert_eq!(record.user_id, request.user_id);
        assert_eq!(record.zip_code, "10001");
        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_request_json_shape() {
        let json = r#"{
            "userId": "user-123",
            "tier": "VIP",
            "seat": 1,
            "idempotencyKey": "key-1",
            "paymentId": "pay-1",
            "paymentStatus": "CONFIRMED"
        }"#;
        let request: BookingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.tier, Tier::Vip);
        assert_eq!(request.status, BookingStatus::Pending);
        assert_eq!(request.currency, Currency::usd());
        assert_eq!(request.derived_status(), BookingStatus::Confirmed);
    }
}
