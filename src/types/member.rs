//! Member-related types
//!
//! A member is a participant in the shared coffee fund: they hold a prepaid
//! balance, may carry a proximity card, and may be flagged as administrator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Member identifier (SQLite rowid)
pub type MemberId = i64;

/// A member of the coffee fund
///
/// The balance is the current-state projection of the member's ledger:
/// it always equals the sum of all ledger entry amounts for the member.
/// Balance mutation happens exclusively through the booking service.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,

    /// Display name, unique across the fund
    pub name: String,

    /// Proximity card UID, unique, stored normalized (no whitespace, uppercase)
    pub card_uid: Option<String>,

    /// Opaque credential hash; hashing and verification happen upstream
    pub credential_hash: Option<String>,

    /// Administrators may perform booking operations beyond purchases
    pub is_admin: bool,

    /// Current balance in currency units (may be negative)
    pub balance: Decimal,
}

/// The slice of member state a kiosk session holds after authentication
///
/// The snapshot references the member by id only; it never outlives the
/// session and logging out does not touch the member itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub id: MemberId,
    pub name: String,
    pub balance: Decimal,
}

impl From<&Member> for MemberSnapshot {
    fn from(member: &Member) -> Self {
        MemberSnapshot {
            id: member.id,
            name: member.name.clone(),
            balance: member.balance,
        }
    }
}

/// Normalize a raw card UID for storage and lookup
///
/// Card readers report UIDs with varying whitespace and casing depending on
/// the driver. All whitespace is stripped and the result uppercased, so
/// `"ab cd"` and `"ABCD"` refer to the same card.
pub fn normalize_card_uid(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
