//! Defines the endpoint for deleting an account.

use axum::{Extension, extract::State, http::StatusCode};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    Error,
    account::{Account, AccountState, delete_account, get_owned_account},
    auth::UserID,
    database_id::AccountId,
    db::lock,
    error::{AppPath, AppQuery},
    ledger::recalculate_balances,
    trade::count_trades_for_account,
    transaction::{
        count_transactions_for_account, delete_transactions_for_account,
        get_transfer_counterparts,
    },
};

/// Balances smaller than this are treated as zero.
const BALANCE_EPSILON: f64 = 1e-9;

/// The query string for deleting an account.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DeleteAccountQuery {
    /// Delete the account's transactions and trades too.
    #[serde(default)]
    pub cascade: bool,
}

fn check_can_delete(account: &Account, connection: &Connection) -> Result<(), Error> {
    if account.balance.abs() >= BALANCE_EPSILON {
        return Err(Error::NonZeroBalance(account.balance));
    }

    let entries = count_transactions_for_account(account.id, connection)?
        + count_trades_for_account(account.id, connection)?;

    if entries > 0 {
        return Err(Error::AccountHasEntries);
    }

    Ok(())
}

/// A route handler for deleting an account.
///
/// Without `?cascade=true` only empty accounts with a zero balance can be
/// deleted. A cascading delete removes the account's transactions and trades
/// and recalculates the accounts it shared transfers with.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
    AppQuery(query): AppQuery<DeleteAccountQuery>,
) -> Result<StatusCode, Error> {
    let connection = lock(&state.db_connection)?;
    let account = get_owned_account(account_id, user_id, &connection)?;

    if !query.cascade {
        check_can_delete(&account, &connection)?;
    }

    let transaction = connection.unchecked_transaction()?;

    let counterparts = get_transfer_counterparts(account_id, &transaction)?;
    let deleted_transactions = delete_transactions_for_account(account_id, &transaction)?;
    delete_account(account_id, &transaction)?;
    recalculate_balances(counterparts, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "User {user_id} deleted account {account_id} and {deleted_transactions} transactions"
    );

    Ok(StatusCode::NO_CONTENT)
}
