//! Defines the endpoints for activating and deactivating accounts.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{
        Account, AccountState, StatusChange, get_owned_account, get_status_history,
        record_status_change, set_account_active,
    },
    auth::UserID,
    database_id::AccountId,
    db::lock,
    error::{AppJson, AppPath},
};

/// The request body for changing the status of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusForm {
    /// Whether the account should accept new transactions and trades.
    pub is_active: bool,
    /// Why the status is changing.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A route handler for activating or deactivating an account.
///
/// Setting the status an account already has is a no-op and is not added to its history.
pub async fn set_account_status_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
    AppJson(form): AppJson<StatusForm>,
) -> Result<Json<Account>, Error> {
    let connection = lock(&state.db_connection)?;
    let account = get_owned_account(account_id, user_id, &connection)?;

    if account.is_active == form.is_active {
        return Ok(Json(account));
    }

    let reason = form
        .reason
        .map(|reason| reason.trim().to_owned())
        .filter(|reason| !reason.is_empty());

    let transaction = connection.unchecked_transaction()?;
    set_account_active(account_id, form.is_active, &transaction)?;
    record_status_change(account_id, form.is_active, reason, &transaction)?;
    transaction.commit()?;

    tracing::info!(
        "User {user_id} set account {account_id} to {}",
        if form.is_active { "active" } else { "inactive" }
    );

    Ok(Json(Account {
        is_active: form.is_active,
        ..account
    }))
}

/// List the status changes of an account, oldest first.
pub async fn get_status_history_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
) -> Result<Json<Vec<StatusChange>>, Error> {
    let connection = lock(&state.db_connection)?;
    get_owned_account(account_id, user_id, &connection)?;

    get_status_history(account_id, &connection).map(Json)
}
