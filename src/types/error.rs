//! Error types for the coffee fund system
//!
//! One taxonomy covers the whole crate: validation and constraint failures
//! surface as typed variants at the booking service boundary, kiosk-side
//! connectivity problems map to `ServiceUnavailable`, and storage failures
//! are fatal to the single operation that hit them, never to the process.

use rust_decimal::Decimal;
use thiserror::Error;

use super::member::MemberId;

/// Main error type for ledger, booking, forecast and kiosk operations
#[derive(Debug, Error)]
pub enum KasseError {
    /// The referenced member does not exist
    #[error("unknown member {member_id}")]
    UnknownMember {
        /// The member id that was not found
        member_id: MemberId,
    },

    /// Member creation or edit collided with an existing name
    #[error("member name '{name}' is already taken")]
    DuplicateName {
        /// The conflicting name
        name: String,
    },

    /// Member creation or edit collided with an existing card UID
    #[error("card UID '{card_uid}' is already registered")]
    DuplicateCard {
        /// The conflicting (normalized) card UID
        card_uid: String,
    },

    /// An amount failed validation (non-positive where positive is required)
    #[error("invalid amount {amount} for {operation}: must be positive")]
    InvalidAmount {
        /// Operation that rejected the amount
        operation: String,
        /// The rejected amount
        amount: Decimal,
    },

    /// The ledger service could not be reached from the kiosk
    #[error("ledger service unavailable: {message}")]
    ServiceUnavailable {
        /// Transport-level detail
        message: String,
    },

    /// A card UID did not match any member
    #[error("authentication failed for card '{card_uid}'")]
    AuthenticationFailed {
        /// The normalized card UID that was probed
        card_uid: String,
    },

    /// A non-administrator attempted an administrator-only operation
    #[error("operation '{operation}' requires administrator privilege")]
    Unauthorized {
        /// The attempted operation
        operation: String,
    },

    /// A balance update would overflow
    #[error("arithmetic overflow in {operation} for member {member_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Affected member
        member_id: MemberId,
    },

    /// A stored decimal could not be parsed back
    #[error("malformed decimal '{value}' in storage")]
    MalformedDecimal {
        /// The raw stored text
        value: String,
    },

    /// A stored entry kind is not recognized
    #[error("unknown entry kind '{value}' in storage")]
    UnknownEntryKind {
        /// The raw stored text
        value: String,
    },

    /// Database error from SQLite
    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O error (listener setup, database file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KasseError {
    /// Create an UnknownMember error
    pub fn unknown_member(member_id: MemberId) -> Self {
        KasseError::UnknownMember { member_id }
    }

    /// Create a DuplicateName error
    pub fn duplicate_name(name: &str) -> Self {
        KasseError::DuplicateName {
            name: name.to_string(),
        }
    }

    /// Create a DuplicateCard error
    pub fn duplicate_card(card_uid: &str) -> Self {
        KasseError::DuplicateCard {
            card_uid: card_uid.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(operation: &str, amount: Decimal) -> Self {
        KasseError::InvalidAmount {
            operation: operation.to_string(),
            amount,
        }
    }

    /// Create a ServiceUnavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        KasseError::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create an AuthenticationFailed error
    pub fn authentication_failed(card_uid: &str) -> Self {
        KasseError::AuthenticationFailed {
            card_uid: card_uid.to_string(),
        }
    }

    /// Create an Unauthorized error
    pub fn unauthorized(operation: &str) -> Self {
        KasseError::Unauthorized {
            operation: operation.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, member_id: MemberId) -> Self {
        KasseError::ArithmeticOverflow {
            operation: operation.to_string(),
            member_id,
        }
    }
}
