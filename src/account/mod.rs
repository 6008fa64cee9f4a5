//! Financial accounts, their status history and the endpoints for managing them.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;
mod state;
mod status_endpoint;
mod status_history;

pub use core::{
    Account, AccountType, AccountUpdate, NewAccount, create_account, create_account_table,
    delete_account, get_account, get_accounts_for_user, get_owned_account, map_row_to_account,
    set_account_active, set_account_balance, update_account, validate_account_name,
    validate_balance, validate_currency,
};
pub use create_endpoint::{AccountForm, create_account_endpoint};
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::{EditAccountForm, edit_account_endpoint};
pub use get_endpoint::{get_account_endpoint, list_accounts_endpoint};
pub use state::AccountState;
pub use status_endpoint::{StatusForm, get_status_history_endpoint, set_account_status_endpoint};
pub use status_history::{
    StatusChange, create_status_history_table, get_status_history, record_status_change,
};
