//! Deposits, withdrawals, transfers and dividends, and the endpoints for managing them.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;
mod state;

pub use core::{
    NewTransaction, Transaction, TransactionForm, TransactionQuery, TransactionType,
    check_transaction_accounts, count_transactions_for_account, create_transaction,
    create_transaction_table, delete_transaction, delete_transactions_for_account,
    get_owned_transaction, get_transaction, get_transactions_for_account,
    get_transfer_counterparts, map_transaction_row, query_transactions, update_transaction,
    validate_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use get_endpoint::{
    ListTransactionsQuery, get_transaction_endpoint, list_transactions_endpoint,
};
pub use state::TransactionState;
