//! Booking service
//!
//! The single entry point for every balance change. Each operation validates
//! its input, checks the caller's privilege, and produces exactly one ledger
//! entry through the store's atomic append (or one of the two composite
//! transactions: member edit with its synthetic correction entry, and bean
//! delivery with its credit entry). Failures are typed and independent: a
//! rejected booking changes nothing and never affects other bookings.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::store::LedgerStore;
use crate::types::{EntryId, EntryKind, KasseError, Member, MemberId};

/// Request-scoped caller identity
///
/// Passed explicitly into every operation instead of living in ambient
/// process state. The HTTP layer constructs it per request; the kiosk is
/// always a plain, non-administrator caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The member acting, when known (admin web sessions carry one)
    pub member_id: Option<MemberId>,

    /// Whether the caller holds administrator privilege
    pub is_admin: bool,
}

impl Actor {
    /// An administrative caller (identity resolved by the web session layer)
    pub fn administrator() -> Self {
        Actor {
            member_id: None,
            is_admin: true,
        }
    }

    /// The kiosk terminal: unauthenticated, purchase-only
    pub fn kiosk() -> Self {
        Actor {
            member_id: None,
            is_admin: false,
        }
    }
}

/// The transactional boundary for all balance mutations
pub struct BookingService {
    store: Arc<LedgerStore>,
}

impl BookingService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        BookingService { store }
    }

    fn require_admin(actor: &Actor, operation: &str) -> Result<(), KasseError> {
        if actor.is_admin {
            Ok(())
        } else {
            Err(KasseError::unauthorized(operation))
        }
    }

    /// Create a member. Administrator only.
    pub fn create_member(
        &self,
        actor: &Actor,
        name: &str,
        credential_hash: Option<&str>,
        card_uid: Option<&str>,
    ) -> Result<Member, KasseError> {
        Self::require_admin(actor, "create member")?;
        let member = self
            .store
            .create_member(name, credential_hash, card_uid, false)?;
        info!(member_id = member.id, name = %member.name, "member created");
        Ok(member)
    }

    /// Hard reset of name, card UID and balance. Administrator only.
    ///
    /// The balance is set directly rather than booked; the store records
    /// the applied delta as an `AdminCorrection` entry so the reset remains
    /// auditable.
    pub fn edit_member(
        &self,
        actor: &Actor,
        member_id: MemberId,
        name: &str,
        card_uid: Option<&str>,
        new_balance: Decimal,
    ) -> Result<Member, KasseError> {
        Self::require_admin(actor, "edit member")?;
        self.store
            .edit_member(member_id, name, card_uid, new_balance, Utc::now())?;
        info!(member_id, balance = %new_balance, "member edited (hard reset)");
        self.store.member(member_id)
    }

    /// Delete a member. Administrator only. Ledger history stays behind.
    pub fn delete_member(&self, actor: &Actor, member_id: MemberId) -> Result<(), KasseError> {
        Self::require_admin(actor, "delete member")?;
        self.store.delete_member(member_id)?;
        info!(member_id, "member deleted");
        Ok(())
    }

    /// Book cash in or out. Administrator only.
    ///
    /// A negative amount is a payout; the entry kind and description are
    /// selected by the sign.
    pub fn deposit(
        &self,
        actor: &Actor,
        member_id: MemberId,
        amount: Decimal,
    ) -> Result<(EntryId, Decimal), KasseError> {
        Self::require_admin(actor, "deposit")?;
        let (kind, description) = if amount < Decimal::ZERO {
            (EntryKind::Withdrawal, "Cash payout")
        } else {
            (EntryKind::Deposit, "Cash deposit")
        };
        let booked = self
            .store
            .append(member_id, kind, description, amount, Utc::now())?;
        info!(member_id, amount = %amount, kind = kind.as_str(), "cash booked");
        Ok(booked)
    }

    /// Record a bean delivery and credit the payer. Administrator only.
    pub fn record_bean_delivery(
        &self,
        actor: &Actor,
        member_id: MemberId,
        grams: i64,
        unit_price: Decimal,
        variety: &str,
    ) -> Result<(EntryId, Decimal), KasseError> {
        Self::require_admin(actor, "bean delivery")?;
        if grams <= 0 {
            return Err(KasseError::invalid_amount(
                "bean delivery",
                Decimal::from(grams),
            ));
        }
        let booked =
            self.store
                .add_bean_delivery(member_id, grams, unit_price, variety, Utc::now())?;
        info!(member_id, grams, variety, "bean delivery recorded");
        Ok(booked)
    }

    /// Credit a reimbursed expense (filters, descaler, ...). Administrator only.
    pub fn reimburse(
        &self,
        actor: &Actor,
        member_id: MemberId,
        amount: Decimal,
        category: &str,
    ) -> Result<(EntryId, Decimal), KasseError> {
        Self::require_admin(actor, "reimburse")?;
        let description = format!("Expense: {category}");
        let booked = self.store.append(
            member_id,
            EntryKind::Reimbursement,
            &description,
            amount,
            Utc::now(),
        )?;
        info!(member_id, amount = %amount, category, "expense reimbursed");
        Ok(booked)
    }

    /// Book a product purchase. The only operation open to the kiosk.
    ///
    /// The price must be positive; overdrawing the balance is permitted
    /// (the fund runs on trust, negative balances are settled in cash).
    pub fn purchase(
        &self,
        member_id: MemberId,
        product: &str,
        price: Decimal,
    ) -> Result<(EntryId, Decimal), KasseError> {
        if price <= Decimal::ZERO {
            return Err(KasseError::invalid_amount("purchase", price));
        }
        let booked = self.store.append(
            member_id,
            EntryKind::Purchase,
            product,
            -price,
            Utc::now(),
        )?;
        info!(member_id, product, price = %price, new_balance = %booked.1, "purchase booked");
        Ok(booked)
    }
}
