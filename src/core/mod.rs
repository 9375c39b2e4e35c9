//! Core business logic module
//!
//! This module contains the two sides of the ledger's business logic:
//! - `booking` - the transactional boundary every balance change goes through
//! - `forecast` - pure read-side statistics derived from the ledger

pub mod booking;
pub mod forecast;

pub use booking::{Actor, BookingService};
pub use forecast::{
    FinancialHealth, ForecastEngine, ForecastStats, RestockRecommendation, DEFAULT_GRAMS_PER_CUP,
};
