//! HTTP API module
//!
//! Wire DTOs shared with the kiosk client, and the axum service boundary.

pub mod dto;
pub mod server;

pub use server::{router, serve, AppState};
