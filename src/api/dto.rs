//! Wire types for the HTTP API
//!
//! Shared between the axum handlers and the kiosk's HTTP client, so both
//! ends of the wire agree on field names by construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Member, MemberId};

/// Response of `GET /api/check_card/{uid}`
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CardCheckResponse {
    Ok {
        #[serde(rename = "memberID")]
        member_id: MemberId,
        name: String,
        balance: Decimal,
    },
    Unknown {
        uid: String,
    },
}

/// Body of `POST /api/book`
#[derive(Debug, Serialize, Deserialize)]
pub struct BookRequest {
    #[serde(rename = "memberID")]
    pub member_id: MemberId,
    pub product: String,
    pub price: Decimal,
}

/// Success response of `POST /api/book`
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub status: String,
    #[serde(rename = "newBalance")]
    pub new_balance: Decimal,
}

impl BookResponse {
    pub fn success(new_balance: Decimal) -> Self {
        BookResponse {
            status: "success".to_string(),
            new_balance,
        }
    }
}

/// Error body returned with every non-2xx status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

/// Body of `POST /api/admin/members`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    /// Opaque credential hash; hashing happens in the web layer
    pub credential_hash: Option<String>,
    pub card_uid: Option<String>,
}

/// Body of `PUT /api/admin/members/{id}` (administrative hard reset)
#[derive(Debug, Serialize, Deserialize)]
pub struct EditMemberRequest {
    pub name: String,
    pub card_uid: Option<String>,
    pub balance: Decimal,
}

/// Body of `POST /api/admin/deposit`
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub member_id: MemberId,
    /// Negative amounts book a cash payout
    pub amount: Decimal,
}

/// Body of `POST /api/admin/beans`
#[derive(Debug, Serialize, Deserialize)]
pub struct BeanDeliveryRequest {
    pub member_id: MemberId,
    pub grams: i64,
    pub unit_price: Decimal,
    pub variety: String,
}

/// Body of `POST /api/admin/reimburse`
#[derive(Debug, Serialize, Deserialize)]
pub struct ReimburseRequest {
    pub member_id: MemberId,
    pub amount: Decimal,
    pub category: String,
}

/// Member as exposed to the admin surface (credential hash never leaves)
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberView {
    pub id: MemberId,
    pub name: String,
    pub card_uid: Option<String>,
    pub is_admin: bool,
    pub balance: Decimal,
}

impl From<Member> for MemberView {
    fn from(member: Member) -> Self {
        MemberView {
            id: member.id,
            name: member.name,
            card_uid: member.card_uid,
            is_admin: member.is_admin,
            balance: member.balance,
        }
    }
}

/// Outcome of an admin booking (deposit, beans, reimbursement)
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub entry_id: i64,
    #[serde(rename = "newBalance")]
    pub new_balance: Decimal,
}

/// Query parameters of `GET /api/history`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub member_id: Option<MemberId>,
    pub limit: Option<u32>,
}
