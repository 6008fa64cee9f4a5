//! Account and balance snapshot aggregation for the dashboard.
//!
//! Groups accounts by currency for the net worth summary, and folds balance
//! snapshots into a daily net worth time series.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{account::Account, database_id::AccountId, ledger::BalanceSnapshot};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The net worth held in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySummary {
    /// The three letter currency code.
    pub currency: String,
    /// The sum of the balances of every active account in the currency.
    pub net_worth: f64,
    /// The part of `net_worth` held in liquid accounts.
    pub liquid: f64,
    /// The number of active accounts in the currency.
    pub account_count: usize,
}

/// The net worth of one currency at the end of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    /// The UTC date.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// The sum of every account's latest balance at the end of `date`.
    pub value: f64,
}

/// The net worth of one currency over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthSeries {
    /// The three letter currency code.
    pub currency: String,
    /// One point per day with at least one snapshot, oldest first.
    pub points: Vec<NetWorthPoint>,
}

/// Sum the balances of the active accounts per currency, ordered by currency.
pub(super) fn summarise_by_currency(accounts: &[Account]) -> Vec<CurrencySummary> {
    let mut totals: BTreeMap<&str, CurrencySummary> = BTreeMap::new();

    for account in accounts.iter().filter(|account| account.is_active) {
        let summary = totals
            .entry(account.currency.as_str())
            .or_insert_with(|| CurrencySummary {
                currency: account.currency.clone(),
                net_worth: 0.0,
                liquid: 0.0,
                account_count: 0,
            });

        summary.net_worth += account.balance;
        summary.account_count += 1;

        if account.is_liquid {
            summary.liquid += account.balance;
        }
    }

    totals.into_values().collect()
}

/// Fold balance snapshots into a daily net worth series.
///
/// `snapshots` must be sorted oldest first. Each point carries, for every
/// account seen so far, the latest snapshot at or before the end of the day.
pub(super) fn build_net_worth_series(
    currency: &str,
    snapshots: &[BalanceSnapshot],
) -> NetWorthSeries {
    let mut latest: HashMap<AccountId, f64> = HashMap::new();
    let mut points: Vec<NetWorthPoint> = Vec::new();

    for snapshot in snapshots {
        let date = snapshot.recorded_at.date();
        latest.insert(snapshot.account_id, snapshot.balance);
        let value = latest.values().sum();

        match points.last_mut() {
            Some(point) if point.date == date => point.value = value,
            _ => points.push(NetWorthPoint { date, value }),
        }
    }

    NetWorthSeries {
        currency: currency.to_owned(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        account::{Account, AccountType},
        auth::UserID,
        ledger::BalanceSnapshot,
    };

    use super::{build_net_worth_series, summarise_by_currency};

    fn account(id: i64, currency: &str, balance: f64, is_liquid: bool, is_active: bool) -> Account {
        Account {
            id,
            user_id: UserID::new(1),
            name: format!("Account {id}"),
            currency: currency.to_owned(),
            account_type: AccountType::Cash,
            is_liquid,
            is_active,
            initial_balance: 0.0,
            balance,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn snapshot(account_id: i64, balance: f64, recorded_at: OffsetDateTime) -> BalanceSnapshot {
        BalanceSnapshot {
            id: 0,
            account_id,
            balance,
            recorded_at,
        }
    }

    #[test]
    fn summary_groups_active_accounts_by_currency() {
        let accounts = [
            account(1, "NZD", 100.0, true, true),
            account(2, "NZD", 250.0, false, true),
            account(3, "USD", 40.0, true, true),
            account(4, "NZD", 999.0, true, false),
        ];

        let got = summarise_by_currency(&accounts);

        let rows: Vec<(&str, f64, f64, usize)> = got
            .iter()
            .map(|row| (row.currency.as_str(), row.net_worth, row.liquid, row.account_count))
            .collect();
        assert_eq!(rows, vec![("NZD", 350.0, 100.0, 2), ("USD", 40.0, 40.0, 1)]);
    }

    #[test]
    fn series_uses_latest_snapshot_per_account_per_day() {
        let snapshots = [
            snapshot(1, 100.0, datetime!(2025-01-01 09:00 UTC)),
            snapshot(1, 150.0, datetime!(2025-01-01 17:00 UTC)),
            snapshot(2, 20.0, datetime!(2025-01-02 08:00 UTC)),
            snapshot(1, 120.0, datetime!(2025-01-04 12:00 UTC)),
        ];

        let series = build_net_worth_series("NZD", &snapshots);

        let points: Vec<(String, f64)> = series
            .points
            .iter()
            .map(|point| (point.date.to_string(), point.value))
            .collect();
        assert_eq!(
            points,
            vec![
                ("2025-01-01".to_owned(), 150.0),
                ("2025-01-02".to_owned(), 170.0),
                ("2025-01-04".to_owned(), 140.0),
            ]
        );
    }

    #[test]
    fn series_without_snapshots_is_empty() {
        let series = build_net_worth_series("USD", &[]);

        assert_eq!(series.currency, "USD");
        assert!(series.points.is_empty());
    }
}
