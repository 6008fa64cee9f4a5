//! Defines the endpoints for reading accounts.

use axum::{Extension, Json, extract::State};

use crate::{
    Error,
    account::{Account, AccountState, get_accounts_for_user, get_owned_account},
    auth::UserID,
    database_id::AccountId,
    db::lock,
    error::AppPath,
};

/// List the authenticated user's accounts, ordered by name.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock(&state.db_connection)?;

    get_accounts_for_user(user_id, &connection).map(Json)
}

/// Get one of the authenticated user's accounts.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock(&state.db_connection)?;

    get_owned_account(account_id, user_id, &connection).map(Json)
}
