//! Gathers an account's history from the database and keeps its stored balance in sync.

use rusqlite::Connection;

use crate::{
    Error,
    account::{Account, get_account, set_account_balance},
    database_id::AccountId,
    ledger::{
        balance_history::record_balance,
        fold::{EntryKind, Ledger, LedgerEntry, replay},
    },
    trade::{Trade, get_trades_for_account},
    transaction::{Transaction, get_transactions_for_account},
};

fn transaction_entry(transaction: &Transaction, account_id: AccountId) -> LedgerEntry {
    LedgerEntry {
        kind: EntryKind::Transaction,
        id: transaction.id,
        occurred_at: transaction.occurred_at,
        delta: transaction.delta_for(account_id),
        description: transaction.description.clone(),
    }
}

/// Open trades have no entry.
fn trade_entry(trade: &Trade) -> Option<LedgerEntry> {
    let exit_at = trade.exit_at?;
    let pnl = trade.realized_pnl()?;

    Some(LedgerEntry {
        kind: EntryKind::Trade,
        id: trade.id,
        occurred_at: exit_at,
        delta: pnl,
        description: format!("{:?} {}", trade.direction, trade.instrument),
    })
}

/// Get every transaction and closed trade that changes the balance of the account.
pub fn get_ledger_entries(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    let transactions = get_transactions_for_account(account_id, connection)?;
    let trades = get_trades_for_account(account_id, connection)?;

    let entries = transactions
        .iter()
        .map(|transaction| transaction_entry(transaction, account_id))
        .chain(trades.iter().filter_map(trade_entry))
        .collect();

    Ok(entries)
}

/// Replay the account's history without storing anything.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist.
pub fn get_ledger(account_id: AccountId, connection: &Connection) -> Result<Ledger, Error> {
    let account = get_account(account_id, connection)?;
    let entries = get_ledger_entries(account_id, connection)?;

    Ok(replay(account.id, account.initial_balance, entries))
}

/// Replay the account's history, store the resulting balance and append a
/// balance snapshot.
///
/// Runs in its own SQL transaction unless the caller already opened one.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist.
pub fn recalculate_balance(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    let sql_transaction = if connection.is_autocommit() {
        Some(connection.unchecked_transaction()?)
    } else {
        None
    };

    let account = get_account(account_id, connection)?;
    let entries = get_ledger_entries(account_id, connection)?;
    let ledger = replay(account.id, account.initial_balance, entries);

    set_account_balance(account_id, ledger.balance, connection)?;
    record_balance(account_id, ledger.balance, connection)?;

    if let Some(sql_transaction) = sql_transaction {
        sql_transaction.commit()?;
    }

    tracing::debug!(
        "Recalculated balance of account {account_id}: {} -> {}",
        account.balance,
        ledger.balance
    );

    Ok(Account {
        balance: ledger.balance,
        ..account
    })
}

/// Recalculate each account once, in ascending ID order.
pub fn recalculate_balances(
    account_ids: impl IntoIterator<Item = AccountId>,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    let mut account_ids: Vec<AccountId> = account_ids.into_iter().collect();
    account_ids.sort_unstable();
    account_ids.dedup();

    account_ids
        .into_iter()
        .map(|account_id| recalculate_balance(account_id, connection))
        .collect()
}
