//! Replays transactions and closed trades into account balances.

mod balance_history;
mod endpoints;
mod fold;
mod recalculate;

pub use balance_history::{
    BalanceSnapshot, create_balance_history_table, get_balance_history,
    get_balance_history_for_currency,
};
pub use endpoints::{get_balance_history_endpoint, get_ledger_endpoint, recalculate_endpoint};
pub use fold::{EntryKind, Ledger, LedgerEntry, LedgerLine, replay};
pub use recalculate::{get_ledger, get_ledger_entries, recalculate_balance, recalculate_balances};
