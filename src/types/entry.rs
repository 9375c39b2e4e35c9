//! Ledger entry types
//!
//! Every balance change is recorded as one immutable, dated ledger entry.
//! Insertion order (the entry id) defines the canonical ledger order, both
//! per member and globally.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::member::MemberId;

/// Ledger entry identifier (SQLite rowid)
pub type EntryId = i64;

/// The kind of balance change an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A product booked at the kiosk; amount is negative
    Purchase,

    /// Cash paid into the fund
    Deposit,

    /// Cash paid out of the fund
    Withdrawal,

    /// Credit for a bean delivery paid out of pocket
    BeanDelivery,

    /// Credit for a reimbursed expense (filters, descaler, ...)
    Reimbursement,

    /// Synthetic entry recording the delta applied by an administrative
    /// balance reset, so the escape hatch stays auditable
    AdminCorrection,
}

impl EntryKind {
    /// Storage representation of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Purchase => "purchase",
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::BeanDelivery => "bean_delivery",
            EntryKind::Reimbursement => "reimbursement",
            EntryKind::AdminCorrection => "admin_correction",
        }
    }

    /// Parse the storage representation back into a kind
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purchase" => Some(EntryKind::Purchase),
            "deposit" => Some(EntryKind::Deposit),
            "withdrawal" => Some(EntryKind::Withdrawal),
            "bean_delivery" => Some(EntryKind::BeanDelivery),
            "reimbursement" => Some(EntryKind::Reimbursement),
            "admin_correction" => Some(EntryKind::AdminCorrection),
            _ => None,
        }
    }
}

/// One immutable record of a balance change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub kind: EntryKind,

    /// Free-text booking description (product name, expense category, ...)
    pub description: String,

    /// Signed amount; negative reduces the member's balance
    pub amount: Decimal,

    /// Assigned at append time; append order and timestamp order agree
    pub created_at: DateTime<Utc>,
}

/// A ledger entry joined with member identity for audit views
///
/// `member_name` is `None` when the owning member has since been deleted;
/// historical entries are retained rather than cascaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub member_name: Option<String>,
    pub kind: EntryKind,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A recorded bean delivery
///
/// Deliveries feed the forecast engine only; the balance effect of a
/// delivery is the accompanying `BeanDelivery` ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeanDelivery {
    pub id: EntryId,
    pub member_id: MemberId,

    /// Delivered weight in grams, always positive
    pub grams: i64,

    /// Price per gram the payer is owed back
    pub unit_price: Decimal,

    /// Variety label ("Arabica", "House Blend", ...)
    pub variety: String,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EntryKind::Purchase, "purchase")]
    #[case(EntryKind::Deposit, "deposit")]
    #[case(EntryKind::Withdrawal, "withdrawal")]
    #[case(EntryKind::BeanDelivery, "bean_delivery")]
    #[case(EntryKind::Reimbursement, "reimbursement")]
    #[case(EntryKind::AdminCorrection, "admin_correction")]
    fn test_kind_round_trips_through_storage_form(#[case] kind: EntryKind, #[case] text: &str) {
        assert_eq!(kind.as_str(), text);
        assert_eq!(EntryKind::parse(text), Some(kind));
    }

    #[test]
    fn test_unknown_kind_does_not_parse() {
        assert_eq!(EntryKind::parse("KAUF"), None);
        assert_eq!(EntryKind::parse(""), None);
    }
}
