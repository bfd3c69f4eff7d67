//! Seatbook Common Types
//!
//! This crate contains shared types used across the Seatbook reservation
//! core, including identifiers, monetary types, the venue layout, booking
//! records and the error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod venue;
pub mod booking;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use venue::*;
pub use booking::*;
pub use error::*;
pub use time::*;
