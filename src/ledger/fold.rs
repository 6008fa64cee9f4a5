//! The pure replay of an account's history into a running balance.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::database_id::{AccountId, DatabaseId};

/// Where a ledger entry came from.
///
/// The ordering puts transactions before trades when two entries share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// A deposit, withdrawal, transfer or dividend.
    Transaction,
    /// A closed trade.
    Trade,
}

/// A change to an account's balance.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// The kind of record the entry came from.
    pub kind: EntryKind,
    /// The ID of the transaction or trade.
    pub id: DatabaseId,
    /// When the change took effect.
    pub occurred_at: OffsetDateTime,
    /// The signed change to the balance.
    pub delta: f64,
    /// A short human readable label.
    pub description: String,
}

impl LedgerEntry {
    fn replay_order(&self, other: &Self) -> Ordering {
        self.occurred_at
            .cmp(&other.occurred_at)
            .then(self.kind.cmp(&other.kind))
            .then(self.id.cmp(&other.id))
    }
}

/// One row of a replayed ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// The kind of record the line came from.
    pub kind: EntryKind,
    /// The ID of the transaction or trade.
    pub id: DatabaseId,
    /// When the change took effect.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// The signed change to the balance.
    pub delta: f64,
    /// The balance after this line.
    pub balance: f64,
    /// A short human readable label.
    pub description: String,
}

/// The running balance of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// The account the ledger belongs to.
    pub account_id: AccountId,
    /// The balance before the first line.
    pub initial_balance: f64,
    /// Every balance change, oldest first.
    pub lines: Vec<LedgerLine>,
    /// The balance after the last line.
    pub balance: f64,
}

/// Sort `entries` chronologically and fold them into a running balance
/// starting from `initial_balance`.
///
/// Entries with the same timestamp are ordered transactions first, then by ID.
pub fn replay(account_id: AccountId, initial_balance: f64, mut entries: Vec<LedgerEntry>) -> Ledger {
    entries.sort_by(LedgerEntry::replay_order);

    let mut balance = initial_balance;
    let lines = entries
        .into_iter()
        .map(|entry| {
            balance += entry.delta;

            LedgerLine {
                kind: entry.kind,
                id: entry.id,
                occurred_at: entry.occurred_at,
                delta: entry.delta,
                balance,
                description: entry.description,
            }
        })
        .collect();

    Ledger {
        account_id,
        initial_balance,
        lines,
        balance,
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::{EntryKind, LedgerEntry, replay};

    fn entry(kind: EntryKind, id: i64, occurred_at: OffsetDateTime, delta: f64) -> LedgerEntry {
        LedgerEntry {
            kind,
            id,
            occurred_at,
            delta,
            description: String::new(),
        }
    }

    #[test]
    fn empty_ledger_keeps_initial_balance() {
        let ledger = replay(1, 42.0, vec![]);

        assert_eq!(ledger.balance, 42.0);
        assert!(ledger.lines.is_empty());
    }

    #[test]
    fn running_balance_is_chronological() {
        let now = OffsetDateTime::now_utc();
        let entries = vec![
            entry(EntryKind::Transaction, 2, now, -30.0),
            entry(EntryKind::Transaction, 1, now - Duration::days(1), 100.0),
        ];

        let ledger = replay(1, 10.0, entries);

        let balances: Vec<f64> = ledger.lines.iter().map(|line| line.balance).collect();
        assert_eq!(balances, vec![110.0, 80.0]);
        assert_eq!(ledger.balance, 80.0);
    }

    #[test]
    fn ties_put_transactions_before_trades_then_order_by_id() {
        let now = OffsetDateTime::now_utc();
        let entries = vec![
            entry(EntryKind::Trade, 1, now, 5.0),
            entry(EntryKind::Transaction, 9, now, 1.0),
            entry(EntryKind::Transaction, 3, now, 2.0),
        ];

        let ledger = replay(1, 0.0, entries);

        let order: Vec<(EntryKind, i64)> =
            ledger.lines.iter().map(|line| (line.kind, line.id)).collect();
        assert_eq!(
            order,
            vec![
                (EntryKind::Transaction, 3),
                (EntryKind::Transaction, 9),
                (EntryKind::Trade, 1)
            ]
        );
    }

    #[test]
    fn balance_equals_initial_plus_net_of_deltas() {
        let start = OffsetDateTime::now_utc() - Duration::days(30);
        let deltas = [250.0, -75.5, 12.25, -100.0, 3.0, -0.75];
        let entries = deltas
            .iter()
            .enumerate()
            .map(|(i, &delta)| {
                entry(
                    EntryKind::Transaction,
                    i as i64,
                    start + Duration::days(i as i64),
                    delta,
                )
            })
            .collect();

        let ledger = replay(1, 500.0, entries);

        let want = 500.0 + deltas.iter().sum::<f64>();
        assert!((ledger.balance - want).abs() < 1e-9);
    }
}
