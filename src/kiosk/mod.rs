//! Kiosk terminal module
//!
//! Everything one physical terminal runs: the session state machine, the
//! card reader capability, the HTTP client to the ledger service, and the
//! control loop that wires them together.

pub mod client;
pub mod reader;
pub mod session;
pub mod terminal;

pub use client::{BookingApi, HttpBookingApi};
pub use reader::{CardReader, LineReader, ReadError};
pub use session::{CardOutcome, KioskConfig, PurchaseTicket, SessionMachine};
pub use terminal::Terminal;
