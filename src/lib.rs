//! Kaffeekasse Library
//! # Overview
//!
//! This library implements a shared coffee fund: every member holds a
//! prepaid balance, every balance change is one immutable ledger entry,
//! and a kiosk terminal books purchases against the ledger after a card tap.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Member, LedgerEntry, error taxonomy)
//! - [`store`] - SQLite-backed ledger store with the balance projection
//! - [`core`] - Business logic components:
//!   - [`core::booking`] - The transactional boundary for all balance changes
//!   - [`core::forecast`] - Stock, consumption and restock statistics
//! - [`api`] - HTTP surface (kiosk endpoints + admin surface) and wire DTOs
//! - [`kiosk`] - Terminal session state machine, card reader capability,
//!   ledger client and control loop
//! - [`cli`] - CLI argument parsing
//!
//! # Booking Operations
//!
//! All balance mutation flows through the booking service:
//!
//! - **Purchase**: kiosk-bookable, debits the product price
//! - **Deposit / Withdrawal**: cash in or out, selected by sign
//! - **Bean delivery**: credits the payer with `unit_price * grams`
//! - **Reimbursement**: credits an expense made for the group
//! - **Admin correction**: synthetic entry recording a hard balance reset
//!
//! # Invariant
//!
//! A member's balance always equals the sum of their ledger entries; the
//! store applies both sides of every booking in one transaction.

// Module declarations
pub mod api;
pub mod cli;
pub mod core;
pub mod kiosk;
pub mod store;
pub mod types;

pub use self::core::{Actor, BookingService, FinancialHealth, ForecastEngine, ForecastStats};
pub use self::store::LedgerStore;
pub use self::types::{
    EntryId, EntryKind, HistoryEntry, KasseError, LedgerEntry, Member, MemberId, MemberSnapshot,
};
