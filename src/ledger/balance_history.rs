//! Snapshots of account balances over time.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::{AccountId, DatabaseId},
};

/// The balance of an account at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// The ID of the snapshot.
    pub id: DatabaseId,
    /// The account the balance belongs to.
    pub account_id: AccountId,
    /// The balance.
    pub balance: f64,
    /// When the balance was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Create the balance history table.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_balance_history_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS balance_history (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            balance REAL NOT NULL,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_balance_history_account
         ON balance_history(account_id, recorded_at);",
        (),
    )?;

    Ok(())
}

fn map_row_to_snapshot(row: &Row) -> Result<BalanceSnapshot, rusqlite::Error> {
    Ok(BalanceSnapshot {
        id: row.get(0)?,
        account_id: row.get(1)?,
        balance: row.get(2)?,
        recorded_at: row.get(3)?,
    })
}

/// Append a snapshot of `balance` for the account, timestamped now.
pub fn record_balance(
    account_id: AccountId,
    balance: f64,
    connection: &Connection,
) -> Result<BalanceSnapshot, Error> {
    connection
        .prepare(
            "INSERT INTO balance_history (account_id, balance, recorded_at)
             VALUES (?1, ?2, ?3)
             RETURNING id, account_id, balance, recorded_at",
        )?
        .query_row(
            (account_id, balance, OffsetDateTime::now_utc()),
            map_row_to_snapshot,
        )
        .map_err(Error::from)
}

/// Get the balance snapshots of an account, oldest first.
pub fn get_balance_history(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<BalanceSnapshot>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, balance, recorded_at FROM balance_history
             WHERE account_id = ?1 ORDER BY recorded_at ASC, id ASC",
        )?
        .query_map((account_id,), map_row_to_snapshot)?
        .map(|maybe_snapshot| maybe_snapshot.map_err(Error::from))
        .collect()
}

/// Get the balance snapshots of the user's active accounts in one currency, oldest first.
pub fn get_balance_history_for_currency(
    user_id: UserID,
    currency: &str,
    connection: &Connection,
) -> Result<Vec<BalanceSnapshot>, Error> {
    connection
        .prepare(
            "SELECT h.id, h.account_id, h.balance, h.recorded_at
             FROM balance_history h
             INNER JOIN account a ON a.id = h.account_id
             WHERE a.user_id = ?1 AND a.currency = ?2 AND a.is_active = 1
             ORDER BY h.recorded_at ASC, h.id ASC",
        )?
        .query_map((user_id, currency), map_row_to_snapshot)?
        .map(|maybe_snapshot| maybe_snapshot.map_err(Error::from))
        .collect()
}
