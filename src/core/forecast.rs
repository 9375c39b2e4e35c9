//! Forecast engine
//!
//! Pure read-side statistics over the ledger and the bean delivery log:
//! remaining stock, consumption rate, projected depletion date, the restock
//! recommendation, and the financial health of the whole fund. Nothing here
//! mutates state, and every time-dependent computation takes `now`
//! explicitly so the math is deterministic under test.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::store::LedgerStore;
use crate::types::{KasseError, MemberId};

/// How many grams one cup consumes unless configured otherwise.
pub const DEFAULT_GRAMS_PER_CUP: u32 = 12;

/// Trailing window for the consumption rate, in days.
const RATE_WINDOW_DAYS: i64 = 30;

/// Floor for the consumption rate so depletion math never divides by zero.
const MIN_CUPS_PER_DAY: f64 = 0.1;

/// Who should fund the next bean purchase
///
/// The non-administrator member with the lowest balance: whoever has
/// pre-funded the group the most and should be reimbursed first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockRecommendation {
    pub member_id: MemberId,
    pub name: String,
    pub balance: Decimal,
}

/// Aggregate credit/debt picture of the fund
///
/// `net` should be zero when the books balance; any drift indicates
/// bookkeeping leakage and is worth surfacing on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialHealth {
    pub total_credit: Decimal,
    pub total_debt: Decimal,
    pub net: Decimal,
}

/// Dashboard statistics bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastStats {
    pub stock_grams: i64,
    pub cups_per_day: f64,
    pub days_until_empty: f64,
    pub empty_date: String,
    pub recommendation: Option<RestockRecommendation>,
}

/// Read-side forecasting over the ledger store
pub struct ForecastEngine {
    store: Arc<LedgerStore>,
    grams_per_cup: u32,
}

impl ForecastEngine {
    pub fn new(store: Arc<LedgerStore>, grams_per_cup: u32) -> Self {
        ForecastEngine {
            store,
            grams_per_cup,
        }
    }

    /// Remaining bean stock in grams.
    ///
    /// Delivered grams minus one cup's worth per purchase entry. Negative
    /// means the log says more was brewed than delivered.
    pub fn current_stock(&self) -> Result<i64, KasseError> {
        let delivered = self.store.delivered_grams()?;
        let consumed = self.store.purchase_count()? * i64::from(self.grams_per_cup);
        Ok(delivered - consumed)
    }

    /// Cups per day over the trailing 30 days, floored at 0.1.
    pub fn consumption_rate(&self, now: DateTime<Utc>) -> Result<f64, KasseError> {
        let window_start = now - Duration::days(RATE_WINDOW_DAYS);
        let cups = self.store.purchases_since(window_start)? as f64;
        Ok((cups / RATE_WINDOW_DAYS as f64).max(MIN_CUPS_PER_DAY))
    }

    /// Days until the stock runs out at the current rate.
    ///
    /// Negative when the stock is already depleted; the sign carries how
    /// far overdrawn the stock is, so callers must not clamp it away.
    pub fn days_until_empty(&self, now: DateTime<Utc>) -> Result<f64, KasseError> {
        let stock = self.current_stock()? as f64;
        let burn = self.consumption_rate(now)? * f64::from(self.grams_per_cup);
        Ok(stock / burn)
    }

    /// Calendar date the stock runs out, fractional days truncated.
    pub fn empty_date(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, KasseError> {
        let days = self.days_until_empty(now)?;
        Ok(now + Duration::days(days.trunc() as i64))
    }

    /// The non-admin member with the lowest balance, ties broken by lowest
    /// id. `None` when no non-admin members exist.
    pub fn restock_recommendation(&self) -> Result<Option<RestockRecommendation>, KasseError> {
        // list_members is already ordered by (balance, id) ascending.
        let recommendation = self
            .store
            .list_members()?
            .into_iter()
            .find(|member| !member.is_admin)
            .map(|member| RestockRecommendation {
                member_id: member.id,
                name: member.name,
                balance: member.balance,
            });
        Ok(recommendation)
    }

    /// Sum of positive balances, sum of negative balances, and their net.
    pub fn financial_health(&self) -> Result<FinancialHealth, KasseError> {
        let mut total_credit = Decimal::ZERO;
        let mut total_debt = Decimal::ZERO;
        for member in self.store.list_members()? {
            if member.balance > Decimal::ZERO {
                total_credit += member.balance;
            } else {
                total_debt += member.balance;
            }
        }
        Ok(FinancialHealth {
            total_credit,
            total_debt,
            net: total_credit + total_debt,
        })
    }

    /// Everything the dashboard shows, in one bundle.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<ForecastStats, KasseError> {
        let rate = self.consumption_rate(now)?;
        Ok(ForecastStats {
            stock_grams: self.current_stock()?,
            cups_per_day: (rate * 10.0).round() / 10.0,
            days_until_empty: self.days_until_empty(now)?,
            empty_date: self.empty_date(now)?.format("%d.%m.%Y").to_string(),
            recommendation: self.restock_recommendation()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;

    fn engine() -> (Arc<LedgerStore>, ForecastEngine) {
        let store = Arc::new(LedgerStore::in_memory().unwrap());
        let engine = ForecastEngine::new(Arc::clone(&store), DEFAULT_GRAMS_PER_CUP);
        (store, engine)
    }

    fn add_member(store: &LedgerStore, name: &str, is_admin: bool) -> MemberId {
        store.create_member(name, None, None, is_admin).unwrap().id
    }

    fn buy_cup(store: &LedgerStore, member_id: MemberId, at: DateTime<Utc>) {
        store
            .append(
                member_id,
                EntryKind::Purchase,
                "Kaffee Schwarz",
                Decimal::new(-40, 2),
                at,
            )
            .unwrap();
    }

    #[test]
    fn test_rate_never_hits_zero() {
        let (_store, engine) = engine();
        // No purchases at all: the floor applies.
        assert_eq!(engine.consumption_rate(Utc::now()).unwrap(), 0.1);
    }

    #[test]
    fn test_rate_counts_only_trailing_window() {
        let (store, engine) = engine();
        let member = add_member(&store, "Max", false);
        let now = Utc::now();

        // 60 recent cups, 30 ancient ones that must not count.
        for _ in 0..60 {
            buy_cup(&store, member, now - Duration::days(1));
        }
        for _ in 0..30 {
            buy_cup(&store, member, now - Duration::days(40));
        }

        assert_eq!(engine.consumption_rate(now).unwrap(), 2.0);
    }

    #[test]
    fn test_empty_stock_means_zero_days() {
        let (_store, engine) = engine();
        let now = Utc::now();

        // Stock 0 g, rate floored to 0.1 cups/day at 12 g/cup.
        assert_eq!(engine.current_stock().unwrap(), 0);
        assert_eq!(engine.days_until_empty(now).unwrap(), 0.0);
        assert_eq!(
            engine.empty_date(now).unwrap().date_naive(),
            now.date_naive()
        );
    }

    #[test]
    fn test_stock_subtracts_cup_weight_per_purchase() {
        let (store, engine) = engine();
        let member = add_member(&store, "Max", false);
        store
            .add_bean_delivery(member, 1000, Decimal::new(2, 2), "Arabica", Utc::now())
            .unwrap();
        let now = Utc::now();
        for _ in 0..10 {
            buy_cup(&store, member, now);
        }

        assert_eq!(engine.current_stock().unwrap(), 1000 - 10 * 12);
    }

    #[test]
    fn test_negative_stock_keeps_its_sign() {
        let (store, engine) = engine();
        let member = add_member(&store, "Max", false);
        let now = Utc::now();
        for _ in 0..5 {
            buy_cup(&store, member, now);
        }

        assert_eq!(engine.current_stock().unwrap(), -60);
        assert!(engine.days_until_empty(now).unwrap() < 0.0);
        assert!(engine.empty_date(now).unwrap() < now);
    }

    #[test]
    fn test_days_until_empty_math() {
        let (store, engine) = engine();
        let member = add_member(&store, "Max", false);
        let now = Utc::now();
        store
            .add_bean_delivery(member, 720, Decimal::new(2, 2), "Arabica", now)
            .unwrap();
        // 30 cups in the window -> 1 cup/day -> 12 g/day.
        for _ in 0..30 {
            buy_cup(&store, member, now - Duration::days(1));
        }

        // 720 g delivered minus 360 g consumed = 360 g left = 30 days.
        assert_eq!(engine.days_until_empty(now).unwrap(), 30.0);
        assert_eq!(
            engine.empty_date(now).unwrap().date_naive(),
            (now + Duration::days(30)).date_naive()
        );
    }

    #[test]
    fn test_recommendation_excludes_admins() {
        let (store, engine) = engine();
        let admin = add_member(&store, "Administrator", true);
        let max = add_member(&store, "Max", false);

        // The admin is deepest in the red but must not be recommended.
        store
            .append(admin, EntryKind::Purchase, "x", Decimal::new(-9000, 2), Utc::now())
            .unwrap();
        store
            .append(max, EntryKind::Purchase, "x", Decimal::new(-100, 2), Utc::now())
            .unwrap();

        let rec = engine.restock_recommendation().unwrap().unwrap();
        assert_eq!(rec.member_id, max);
        assert_eq!(rec.balance, Decimal::new(-100, 2));
    }

    #[test]
    fn test_recommendation_ties_break_by_lowest_id() {
        let (store, engine) = engine();
        let first = add_member(&store, "First", false);
        let _second = add_member(&store, "Second", false);

        let rec = engine.restock_recommendation().unwrap().unwrap();
        assert_eq!(rec.member_id, first);
    }

    #[test]
    fn test_recommendation_sentinel_without_members() {
        let (store, engine) = engine();
        add_member(&store, "Administrator", true);

        assert_eq!(engine.restock_recommendation().unwrap(), None);
    }

    #[test]
    fn test_financial_health_sums_and_nets() {
        let (store, engine) = engine();
        let a = add_member(&store, "A", false);
        let b = add_member(&store, "B", false);
        let c = add_member(&store, "C", false);
        store
            .append(a, EntryKind::Deposit, "x", Decimal::new(1000, 2), Utc::now())
            .unwrap();
        store
            .append(b, EntryKind::Purchase, "x", Decimal::new(-250, 2), Utc::now())
            .unwrap();
        store
            .append(c, EntryKind::Purchase, "x", Decimal::new(-750, 2), Utc::now())
            .unwrap();

        let health = engine.financial_health().unwrap();
        assert_eq!(health.total_credit, Decimal::new(1000, 2));
        assert_eq!(health.total_debt, Decimal::new(-1000, 2));
        assert_eq!(health.net, Decimal::ZERO);
    }

    #[test]
    fn test_stats_rounds_rate_to_one_decimal() {
        let (store, engine) = engine();
        let member = add_member(&store, "Max", false);
        let now = Utc::now();
        // 7 cups / 30 days = 0.2333... -> 0.2
        for _ in 0..7 {
            buy_cup(&store, member, now - Duration::days(1));
        }

        let stats = engine.stats(now).unwrap();
        assert_eq!(stats.cups_per_day, 0.2);
        assert!(stats.recommendation.is_some());
    }
}
