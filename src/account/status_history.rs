//! The audit trail of accounts being switched between active and inactive.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, DatabaseId},
};

/// A single change of an account's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The ID of the change.
    pub id: DatabaseId,
    /// The account that changed.
    pub account_id: AccountId,
    /// The status after the change.
    pub is_active: bool,
    /// Why the user changed the status.
    pub reason: Option<String>,
    /// When the change happened.
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
}

pub fn create_status_history_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account_status_history (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            is_active INTEGER NOT NULL,
            reason TEXT,
            changed_at TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_status_change(row: &Row) -> Result<StatusChange, rusqlite::Error> {
    Ok(StatusChange {
        id: row.get(0)?,
        account_id: row.get(1)?,
        is_active: row.get(2)?,
        reason: row.get(3)?,
        changed_at: row.get(4)?,
    })
}

/// Append a status change for the account.
pub fn record_status_change(
    account_id: AccountId,
    is_active: bool,
    reason: Option<String>,
    connection: &Connection,
) -> Result<StatusChange, Error> {
    let changed_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO account_status_history (account_id, is_active, reason, changed_at)
         VALUES (?1, ?2, ?3, ?4)",
        (account_id, is_active, &reason, changed_at),
    )?;

    Ok(StatusChange {
        id: connection.last_insert_rowid(),
        account_id,
        is_active,
        reason,
        changed_at,
    })
}

/// Get the status changes of an account, oldest first.
pub fn get_status_history(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<StatusChange>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, is_active, reason, changed_at FROM account_status_history
             WHERE account_id = ?1 ORDER BY changed_at ASC, id ASC",
        )?
        .query_map((account_id,), map_row_to_status_change)?
        .map(|maybe_change| maybe_change.map_err(Error::from))
        .collect()
}
