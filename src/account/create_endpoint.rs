//! Defines the endpoint for creating a new account.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{
        Account, AccountState, AccountType, NewAccount, create_account, validate_account_name,
        validate_balance, validate_currency,
    },
    auth::UserID,
    db::lock,
    error::AppJson,
    ledger::recalculate_balance,
};

/// The request body for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountForm {
    /// The display name, unique per user.
    pub name: String,
    /// The three letter currency code.
    pub currency: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Defaults to true for cash and savings accounts.
    #[serde(default)]
    pub is_liquid: Option<bool>,
    /// Defaults to zero.
    #[serde(default)]
    pub initial_balance: Option<f64>,
}

/// A route handler for creating a new account.
///
/// The balance is recalculated straight away, which records the first balance snapshot.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppJson(form): AppJson<AccountForm>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let new_account = NewAccount {
        user_id,
        name: validate_account_name(&form.name)?,
        currency: validate_currency(&form.currency)?,
        account_type: form.account_type,
        is_liquid: form
            .is_liquid
            .unwrap_or_else(|| form.account_type.is_liquid_by_default()),
        initial_balance: validate_balance(form.initial_balance.unwrap_or(0.0))?,
    };

    let account = {
        let connection = lock(&state.db_connection)?;
        let transaction = connection.unchecked_transaction()?;

        let account = create_account(new_account, &transaction)?;
        let account = recalculate_balance(account.id, &transaction)?;

        transaction.commit()?;
        account
    };

    tracing::info!("User {user_id} created account {}", account.id);

    Ok((StatusCode::CREATED, Json(account)))
}
