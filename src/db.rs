//! Creates the application's database schema and guards access to the connection.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::{create_account_table, create_status_history_table},
    auth::{create_refresh_token_table, create_user_table, create_user_token_table},
    ledger::create_balance_history_table,
    trade::create_trade_tables,
    transaction::create_transaction_table,
};

/// Create all of the database tables for the domain models.
///
/// Tables are only created if they do not exist, so calling this on an
/// existing database is safe. Foreign key enforcement is switched on for the
/// connection.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_refresh_token_table(&transaction)?;
    create_user_token_table(&transaction)?;
    create_account_table(&transaction)?;
    create_status_history_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_trade_tables(&transaction)?;
    create_balance_history_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
