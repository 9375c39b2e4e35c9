//! Storage module
//!
//! Durable state lives in SQLite; this module owns the schema and the
//! ledger store with its balance projection.

pub mod ledger;

pub use ledger::LedgerStore;
