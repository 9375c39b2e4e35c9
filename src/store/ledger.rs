//! SQLite-backed ledger store
//!
//! The store owns the durable truth of the system: the member table, the
//! append-only ledger, and the bean delivery log. SQLite runs in WAL mode so
//! readers do not block the writer. All writes serialize on a single
//! connection guarded by a mutex; every balance-affecting write updates the
//! member's balance and inserts the ledger entry inside one SQL transaction,
//! so no observer can ever see an entry without its balance delta or vice
//! versa.
//!
//! A `DashMap` keyed by member id carries the current-balance projection.
//! It is loaded when the store opens and refreshed after each committed
//! write while the connection lock is still held, which keeps projection
//! reads lock-free and ordered after the commit they reflect.

// Mutex poisoning indicates a panic in another thread, which is unrecoverable.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use crate::types::{
    normalize_card_uid, BeanDelivery, EntryId, EntryKind, HistoryEntry, KasseError, LedgerEntry,
    Member, MemberId,
};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const MEMBER_COLUMNS: &str = "id, name, card_uid, credential_hash, is_admin, balance";

/// Durable ledger store plus in-memory balance projection
pub struct LedgerStore {
    conn: Arc<Mutex<Connection>>,
    balances: DashMap<MemberId, Decimal>,
}

/// Raw member row before decimal parsing
type MemberRow = (i64, String, Option<String>, Option<String>, bool, String);

/// Raw ledger entry row before decimal/kind parsing
type EntryRow = (i64, i64, String, String, String, i64);

impl LedgerStore {
    /// Open or create the ledger database at the given path.
    ///
    /// The schema is applied idempotently and the balance projection is
    /// loaded before the store is handed out.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KasseError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.as_ref().display(), "ledger store opened");
        Ok(store)
    }

    /// Create an in-memory store for testing.
    pub fn in_memory() -> Result<Self, KasseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, KasseError> {
        conn.execute_batch(SCHEMA_SQL)?;
        let store = LedgerStore {
            conn: Arc::new(Mutex::new(conn)),
            balances: DashMap::new(),
        };
        store.reload_balances()?;
        Ok(store)
    }

    fn reload_balances(&self) -> Result<(), KasseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, balance FROM members")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, raw) in rows {
            self.balances.insert(id, parse_decimal(&raw)?);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// Create a member with a zero balance.
    ///
    /// The card UID is normalized before storage; an empty UID is treated
    /// as "no card". Name and card collisions map to `DuplicateName` and
    /// `DuplicateCard`.
    pub fn create_member(
        &self,
        name: &str,
        credential_hash: Option<&str>,
        card_uid: Option<&str>,
        is_admin: bool,
    ) -> Result<Member, KasseError> {
        let card = card_uid
            .map(normalize_card_uid)
            .filter(|uid| !uid.is_empty());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO members (name, card_uid, credential_hash, is_admin, balance)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                card,
                credential_hash,
                is_admin,
                Decimal::ZERO.to_string()
            ],
        )
        .map_err(|e| map_unique_violation(e, name, card.as_deref()))?;
        let id = conn.last_insert_rowid();
        self.balances.insert(id, Decimal::ZERO);
        drop(conn);

        Ok(Member {
            id,
            name: name.to_string(),
            card_uid: card,
            credential_hash: credential_hash.map(str::to_string),
            is_admin,
            balance: Decimal::ZERO,
        })
    }

    /// Fetch a member by id.
    pub fn member(&self, member_id: MemberId) -> Result<Member, KasseError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1");
        Self::query_member(&conn, &sql, params![member_id])?
            .ok_or_else(|| KasseError::unknown_member(member_id))
    }

    /// Look up a member by card UID.
    ///
    /// The probe is normalized first, so `"ab cd"` finds a card stored as
    /// `"ABCD"`.
    pub fn find_by_card(&self, uid: &str) -> Result<Option<Member>, KasseError> {
        let probe = normalize_card_uid(uid);
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE card_uid = ?1");
        Self::query_member(&conn, &sql, params![probe])
    }

    /// All members, sorted by balance ascending, ties broken by id.
    pub fn list_members(&self) -> Result<Vec<Member>, KasseError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::member_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut members = rows
            .into_iter()
            .map(Self::member_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        members.sort_by(|a, b| a.balance.cmp(&b.balance).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    /// Administrative hard reset of a member's record.
    ///
    /// Name, card UID and balance are overwritten in one transaction. When
    /// the balance changed, a synthetic `AdminCorrection` entry records the
    /// applied delta so the reset stays visible in the audit trail and the
    /// entry-sum invariant keeps holding.
    pub fn edit_member(
        &self,
        member_id: MemberId,
        name: &str,
        card_uid: Option<&str>,
        new_balance: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), KasseError> {
        let card = card_uid
            .map(normalize_card_uid)
            .filter(|uid| !uid.is_empty());

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT balance FROM members WHERE id = ?1",
                params![member_id],
                |row| row.get(0),
            )
            .optional()?;
        let old = parse_decimal(&raw.ok_or_else(|| KasseError::unknown_member(member_id))?)?;

        tx.execute(
            "UPDATE members SET name = ?1, card_uid = ?2, balance = ?3 WHERE id = ?4",
            params![name, card, new_balance.to_string(), member_id],
        )
        .map_err(|e| map_unique_violation(e, name, card.as_deref()))?;

        let delta = new_balance - old;
        if !delta.is_zero() {
            tx.execute(
                "INSERT INTO ledger_entries (member_id, kind, description, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    member_id,
                    EntryKind::AdminCorrection.as_str(),
                    "Balance correction",
                    delta.to_string(),
                    at.timestamp()
                ],
            )?;
        }

        tx.commit()?;
        self.balances.insert(member_id, new_balance);
        Ok(())
    }

    /// Delete a member.
    ///
    /// Historical ledger entries are retained and become orphaned; audit
    /// views render them without a member name.
    pub fn delete_member(&self, member_id: MemberId) -> Result<(), KasseError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM members WHERE id = ?1", params![member_id])?;
        if affected == 0 {
            return Err(KasseError::unknown_member(member_id));
        }
        self.balances.remove(&member_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Append a ledger entry and apply its amount to the member's balance.
    ///
    /// This is the atomic booking primitive: balance read, balance update
    /// and entry insert run in one SQL transaction. On any failure the
    /// transaction rolls back and nothing is applied. Returns the assigned
    /// entry id and the balance after the append.
    pub fn append(
        &self,
        member_id: MemberId,
        kind: EntryKind,
        description: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(EntryId, Decimal), KasseError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT balance FROM members WHERE id = ?1",
                params![member_id],
                |row| row.get(0),
            )
            .optional()?;
        let old = parse_decimal(&raw.ok_or_else(|| KasseError::unknown_member(member_id))?)?;
        let new = old
            .checked_add(amount)
            .ok_or_else(|| KasseError::arithmetic_overflow("append", member_id))?;

        tx.execute(
            "UPDATE members SET balance = ?1 WHERE id = ?2",
            params![new.to_string(), member_id],
        )?;
        tx.execute(
            "INSERT INTO ledger_entries (member_id, kind, description, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member_id,
                kind.as_str(),
                description,
                amount.to_string(),
                at.timestamp()
            ],
        )?;
        let entry_id = tx.last_insert_rowid();

        tx.commit()?;
        // Projection refresh happens under the connection lock so a reader
        // that already sees the entry also sees the new balance.
        self.balances.insert(member_id, new);
        Ok((entry_id, new))
    }

    /// Current balance of a member, read from the projection.
    pub fn balance_of(&self, member_id: MemberId) -> Result<Decimal, KasseError> {
        self.balances
            .get(&member_id)
            .map(|balance| *balance)
            .ok_or_else(|| KasseError::unknown_member(member_id))
    }

    /// Ledger entries of one member, most recent first.
    pub fn entries_for(
        &self,
        member_id: MemberId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, KasseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, member_id, kind, description, amount, created_at
             FROM ledger_entries
             WHERE member_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![member_id, limit], Self::entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        rows.into_iter().map(Self::entry_from_row).collect()
    }

    /// Global or per-member audit history, joined with member identity,
    /// most recent first. Entries of deleted members come back with
    /// `member_name: None`.
    pub fn history(
        &self,
        member_id: Option<MemberId>,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, KasseError> {
        let conn = self.conn.lock().unwrap();
        let rows = match member_id {
            Some(id) => {
                let mut stmt = conn.prepare(
                    "SELECT e.id, e.member_id, m.name, e.kind, e.description, e.amount, e.created_at
                     FROM ledger_entries e
                     LEFT JOIN members m ON m.id = e.member_id
                     WHERE e.member_id = ?1
                     ORDER BY e.id DESC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![id, limit], Self::history_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT e.id, e.member_id, m.name, e.kind, e.description, e.amount, e.created_at
                     FROM ledger_entries e
                     LEFT JOIN members m ON m.id = e.member_id
                     ORDER BY e.id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], Self::history_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        drop(conn);

        rows.into_iter()
            .map(|(id, member_id, member_name, kind, description, amount, created_at)| {
                Ok(HistoryEntry {
                    id,
                    member_id,
                    member_name,
                    kind: parse_kind(&kind)?,
                    description,
                    amount: parse_decimal(&amount)?,
                    created_at: timestamp_to_datetime(created_at),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Bean deliveries
    // ------------------------------------------------------------------

    /// Record a bean delivery and credit the payer in one transaction.
    ///
    /// The credit is `unit_price * grams`, booked as a `BeanDelivery`
    /// ledger entry. Returns the entry id and the balance after the credit.
    pub fn add_bean_delivery(
        &self,
        member_id: MemberId,
        grams: i64,
        unit_price: Decimal,
        variety: &str,
        at: DateTime<Utc>,
    ) -> Result<(EntryId, Decimal), KasseError> {
        let credit = unit_price
            .checked_mul(Decimal::from(grams))
            .ok_or_else(|| KasseError::arithmetic_overflow("bean delivery", member_id))?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT balance FROM members WHERE id = ?1",
                params![member_id],
                |row| row.get(0),
            )
            .optional()?;
        let old = parse_decimal(&raw.ok_or_else(|| KasseError::unknown_member(member_id))?)?;
        let new = old
            .checked_add(credit)
            .ok_or_else(|| KasseError::arithmetic_overflow("bean delivery", member_id))?;

        tx.execute(
            "INSERT INTO bean_deliveries (member_id, grams, unit_price, variety, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member_id,
                grams,
                unit_price.to_string(),
                variety,
                at.timestamp()
            ],
        )?;
        tx.execute(
            "UPDATE members SET balance = ?1 WHERE id = ?2",
            params![new.to_string(), member_id],
        )?;
        tx.execute(
            "INSERT INTO ledger_entries (member_id, kind, description, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member_id,
                EntryKind::BeanDelivery.as_str(),
                format!("Beans {grams}g {variety}"),
                credit.to_string(),
                at.timestamp()
            ],
        )?;
        let entry_id = tx.last_insert_rowid();

        tx.commit()?;
        self.balances.insert(member_id, new);
        Ok((entry_id, new))
    }

    /// Recent bean deliveries, most recent first.
    pub fn recent_deliveries(&self, limit: u32) -> Result<Vec<BeanDelivery>, KasseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, member_id, grams, unit_price, variety, created_at
             FROM bean_deliveries
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        rows.into_iter()
            .map(|(id, member_id, grams, unit_price, variety, created_at)| {
                Ok(BeanDelivery {
                    id,
                    member_id,
                    grams,
                    unit_price: parse_decimal(&unit_price)?,
                    variety,
                    created_at: timestamp_to_datetime(created_at),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Forecast support reads
    // ------------------------------------------------------------------

    /// Total grams ever delivered.
    pub fn delivered_grams(&self) -> Result<i64, KasseError> {
        let conn = self.conn.lock().unwrap();
        let grams = conn.query_row(
            "SELECT COALESCE(SUM(grams), 0) FROM bean_deliveries",
            [],
            |row| row.get(0),
        )?;
        Ok(grams)
    }

    /// Total number of purchase entries.
    pub fn purchase_count(&self) -> Result<i64, KasseError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM ledger_entries WHERE kind = ?1",
            params![EntryKind::Purchase.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of purchase entries newer than the given instant.
    pub fn purchases_since(&self, since: DateTime<Utc>) -> Result<i64, KasseError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM ledger_entries WHERE kind = ?1 AND created_at > ?2",
            params![EntryKind::Purchase.as_str(), since.timestamp()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------

    fn member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn member_from_row(row: MemberRow) -> Result<Member, KasseError> {
        let (id, name, card_uid, credential_hash, is_admin, balance) = row;
        Ok(Member {
            id,
            name,
            card_uid,
            credential_hash,
            is_admin,
            balance: parse_decimal(&balance)?,
        })
    }

    fn query_member(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Member>, KasseError> {
        let row = conn.query_row(sql, params, Self::member_row).optional()?;
        row.map(Self::member_from_row).transpose()
    }

    fn entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn entry_from_row(row: EntryRow) -> Result<LedgerEntry, KasseError> {
        let (id, member_id, kind, description, amount, created_at) = row;
        Ok(LedgerEntry {
            id,
            member_id,
            kind: parse_kind(&kind)?,
            description,
            amount: parse_decimal(&amount)?,
            created_at: timestamp_to_datetime(created_at),
        })
    }

    #[allow(clippy::type_complexity)]
    fn history_row(
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<(i64, i64, Option<String>, String, String, String, i64)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, KasseError> {
    Decimal::from_str(raw).map_err(|_| KasseError::MalformedDecimal {
        value: raw.to_string(),
    })
}

fn parse_kind(raw: &str) -> Result<EntryKind, KasseError> {
    EntryKind::parse(raw).ok_or_else(|| KasseError::UnknownEntryKind {
        value: raw.to_string(),
    })
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

/// Map a SQLite UNIQUE violation on the members table to the matching
/// typed constraint error. Anything else passes through as a storage error.
fn map_unique_violation(err: rusqlite::Error, name: &str, card_uid: Option<&str>) -> KasseError {
    if let rusqlite::Error::SqliteFailure(_, Some(message)) = &err {
        if message.contains("members.name") {
            return KasseError::duplicate_name(name);
        }
        if message.contains("members.card_uid") {
            return KasseError::duplicate_card(card_uid.unwrap_or(""));
        }
    }
    KasseError::Storage(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LedgerStore {
        LedgerStore::in_memory().unwrap()
    }

    fn add_member(store: &LedgerStore, name: &str, card: Option<&str>) -> Member {
        store.create_member(name, None, card, false).unwrap()
    }

    #[test]
    fn test_create_member_starts_at_zero() {
        let store = store();
        let member = add_member(&store, "Max Tester", Some("123456"));

        assert_eq!(member.balance, Decimal::ZERO);
        assert_eq!(store.balance_of(member.id).unwrap(), Decimal::ZERO);
        assert!(!member.is_admin);
    }

    #[test]
    fn test_create_member_normalizes_card() {
        let store = store();
        let member = add_member(&store, "Max Tester", Some("ab cd"));
        assert_eq!(member.card_uid.as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_create_member_empty_card_means_no_card() {
        let store = store();
        let a = add_member(&store, "A", Some(""));
        let b = add_member(&store, "B", Some("  "));

        // Two cardless members must not collide on a '' unique value.
        assert_eq!(a.card_uid, None);
        assert_eq!(b.card_uid, None);
    }

    #[test]
    fn test_duplicate_name_is_typed() {
        let store = store();
        add_member(&store, "Max Tester", None);

        let result = store.create_member("Max Tester", None, None, false);
        assert!(matches!(result, Err(KasseError::DuplicateName { .. })));
    }

    #[test]
    fn test_duplicate_card_is_typed() {
        let store = store();
        add_member(&store, "A", Some("ABCD"));

        // Same card after normalization, different spelling.
        let result = store.create_member("B", None, Some("ab cd"), false);
        assert!(matches!(result, Err(KasseError::DuplicateCard { .. })));
    }

    #[test]
    fn test_find_by_card_normalizes_probe() {
        let store = store();
        let member = add_member(&store, "Max Tester", Some("ABCD"));

        let found = store.find_by_card("ab cd").unwrap().unwrap();
        assert_eq!(found.id, member.id);

        assert!(store.find_by_card("FFFF").unwrap().is_none());
    }

    #[test]
    fn test_append_updates_balance_and_ledger() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);

        let (entry_id, balance) = store
            .append(
                member.id,
                EntryKind::Deposit,
                "Cash deposit",
                Decimal::new(500, 2),
                Utc::now(),
            )
            .unwrap();

        assert!(entry_id > 0);
        assert_eq!(balance, Decimal::new(500, 2));
        assert_eq!(store.balance_of(member.id).unwrap(), Decimal::new(500, 2));

        let entries = store.entries_for(member.id, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Deposit);
        assert_eq!(entries[0].amount, Decimal::new(500, 2));
    }

    #[test]
    fn test_append_unknown_member_changes_nothing() {
        let store = store();
        let result = store.append(
            999,
            EntryKind::Deposit,
            "Cash deposit",
            Decimal::ONE,
            Utc::now(),
        );

        assert!(matches!(result, Err(KasseError::UnknownMember { .. })));
        assert!(store.history(None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_entries_for_is_most_recent_first_and_limited() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);
        for i in 1..=5 {
            store
                .append(
                    member.id,
                    EntryKind::Deposit,
                    &format!("deposit {i}"),
                    Decimal::from(i),
                    Utc::now(),
                )
                .unwrap();
        }

        let entries = store.entries_for(member.id, 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].description, "deposit 5");
        assert_eq!(entries[2].description, "deposit 3");

        // Restartable: asking again yields the same slice.
        let again = store.entries_for(member.id, 3).unwrap();
        assert_eq!(entries, again);
    }

    #[test]
    fn test_balance_equals_entry_sum() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);
        let amounts = [
            Decimal::new(500, 2),
            Decimal::new(-40, 2),
            Decimal::new(-40, 2),
            Decimal::new(1250, 2),
            Decimal::new(-300, 2),
        ];
        for amount in amounts {
            store
                .append(member.id, EntryKind::Deposit, "x", amount, Utc::now())
                .unwrap();
        }

        let sum: Decimal = store
            .entries_for(member.id, u32::MAX)
            .unwrap()
            .iter()
            .map(|e| e.amount)
            .sum();
        assert_eq!(store.balance_of(member.id).unwrap(), sum);
    }

    #[test]
    fn test_edit_member_emits_admin_correction() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);
        store
            .append(
                member.id,
                EntryKind::Deposit,
                "Cash deposit",
                Decimal::new(500, 2),
                Utc::now(),
            )
            .unwrap();

        store
            .edit_member(
                member.id,
                "Max Tester",
                None,
                Decimal::new(1000, 2),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(store.balance_of(member.id).unwrap(), Decimal::new(1000, 2));

        let entries = store.entries_for(member.id, 10).unwrap();
        assert_eq!(entries[0].kind, EntryKind::AdminCorrection);
        assert_eq!(entries[0].amount, Decimal::new(500, 2));

        // The correction keeps the entry-sum invariant intact.
        let sum: Decimal = entries.iter().map(|e| e.amount).sum();
        assert_eq!(sum, store.balance_of(member.id).unwrap());
    }

    #[test]
    fn test_edit_member_without_balance_change_stays_silent() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);

        store
            .edit_member(member.id, "Max Renamed", Some("ABCD"), Decimal::ZERO, Utc::now())
            .unwrap();

        assert!(store.entries_for(member.id, 10).unwrap().is_empty());
        let updated = store.member(member.id).unwrap();
        assert_eq!(updated.name, "Max Renamed");
        assert_eq!(updated.card_uid.as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_delete_member_orphans_history() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);
        store
            .append(
                member.id,
                EntryKind::Purchase,
                "Kaffee Schwarz",
                Decimal::new(-40, 2),
                Utc::now(),
            )
            .unwrap();

        store.delete_member(member.id).unwrap();

        assert!(matches!(
            store.member(member.id),
            Err(KasseError::UnknownMember { .. })
        ));
        let history = store.history(None, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].member_name, None);
        assert_eq!(history[0].member_id, member.id);
    }

    #[test]
    fn test_delete_unknown_member() {
        let store = store();
        assert!(matches!(
            store.delete_member(7),
            Err(KasseError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_bean_delivery_credits_unit_price_times_grams() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);

        // 500 g at 0.03 per gram -> 15.00 credit
        let (_, balance) = store
            .add_bean_delivery(member.id, 500, Decimal::new(3, 2), "Arabica", Utc::now())
            .unwrap();

        assert_eq!(balance, Decimal::new(1500, 2));
        assert_eq!(store.delivered_grams().unwrap(), 500);

        let entries = store.entries_for(member.id, 10).unwrap();
        assert_eq!(entries[0].kind, EntryKind::BeanDelivery);
        assert_eq!(entries[0].description, "Beans 500g Arabica");

        let deliveries = store.recent_deliveries(10).unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].grams, 500);
        assert_eq!(deliveries[0].variety, "Arabica");
    }

    #[test]
    fn test_purchase_counts_respect_window() {
        let store = store();
        let member = add_member(&store, "Max Tester", None);
        let now = Utc::now();

        let recent = now - chrono::Duration::days(3);
        let stale = now - chrono::Duration::days(45);
        for at in [recent, recent, stale] {
            store
                .append(
                    member.id,
                    EntryKind::Purchase,
                    "Kaffee Schwarz",
                    Decimal::new(-40, 2),
                    at,
                )
                .unwrap();
        }

        assert_eq!(store.purchase_count().unwrap(), 3);
        let window_start = now - chrono::Duration::days(30);
        assert_eq!(store.purchases_since(window_start).unwrap(), 2);
    }

    #[test]
    fn test_history_joins_member_names() {
        let store = store();
        let a = add_member(&store, "A", None);
        let b = add_member(&store, "B", None);
        store
            .append(a.id, EntryKind::Deposit, "Cash deposit", Decimal::ONE, Utc::now())
            .unwrap();
        store
            .append(b.id, EntryKind::Deposit, "Cash deposit", Decimal::ONE, Utc::now())
            .unwrap();

        let history = store.history(None, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].member_name.as_deref(), Some("B"));
        assert_eq!(history[1].member_name.as_deref(), Some("A"));

        let only_a = store.history(Some(a.id), 10).unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].member_name.as_deref(), Some("A"));
    }

    // Concurrent access tests: appends must serialize per member so no
    // delta is ever lost, and appends for distinct members must not
    // interfere with each other.
    #[test]
    fn test_concurrent_appends_same_member() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(store());
        let member = add_member(&store, "Max Tester", None);

        let mut handles = vec![];
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let member_id = member.id;
            handles.push(thread::spawn(move || {
                store
                    .append(
                        member_id,
                        EntryKind::Purchase,
                        "Kaffee Schwarz",
                        Decimal::new(-40, 2),
                        Utc::now(),
                    )
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            store.balance_of(member.id).unwrap(),
            Decimal::new(-640, 2)
        );
        assert_eq!(store.entries_for(member.id, 100).unwrap().len(), 16);
    }

    #[test]
    fn test_concurrent_appends_distinct_members() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(store());
        let ids: Vec<MemberId> = (0..8)
            .map(|i| add_member(&store, &format!("member {i}"), None).id)
            .collect();

        let mut handles = vec![];
        for (i, id) in ids.iter().copied().enumerate() {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store
                    .append(
                        id,
                        EntryKind::Deposit,
                        "Cash deposit",
                        Decimal::from(i as i64 + 1),
                        Utc::now(),
                    )
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for (i, id) in ids.iter().copied().enumerate() {
            assert_eq!(store.balance_of(id).unwrap(), Decimal::from(i as i64 + 1));
        }
    }
}
