//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `member`: Member-related types and card UID normalization
//! - `entry`: Ledger entry, history and bean delivery types
//! - `error`: Error taxonomy for the whole system

pub mod entry;
pub mod error;
pub mod member;

pub use entry::{BeanDelivery, EntryId, EntryKind, HistoryEntry, LedgerEntry};
pub use error::KasseError;
pub use member::{normalize_card_uid, Member, MemberId, MemberSnapshot};
