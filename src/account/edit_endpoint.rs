//! Defines the endpoint for editing an account.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{
        Account, AccountState, AccountType, AccountUpdate, get_account, get_owned_account,
        update_account, validate_account_name, validate_balance, validate_currency,
    },
    auth::UserID,
    database_id::AccountId,
    db::lock,
    error::{AppJson, AppPath},
    ledger::recalculate_balance,
};

/// The request body for editing an account. Missing fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditAccountForm {
    /// The new display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Only accepted when it matches the current currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// The new kind of account.
    #[serde(default, rename = "type")]
    pub account_type: Option<AccountType>,
    /// Whether the money can be spent at short notice.
    #[serde(default)]
    pub is_liquid: Option<bool>,
    /// The new opening balance.
    #[serde(default)]
    pub initial_balance: Option<f64>,
}

fn apply_edit(account: &Account, form: EditAccountForm) -> Result<AccountUpdate, Error> {
    if let Some(currency) = form.currency {
        let currency = validate_currency(&currency)?;

        if currency != account.currency {
            return Err(Error::Validation(
                "the currency of an account cannot be changed".to_owned(),
            ));
        }
    }

    Ok(AccountUpdate {
        name: match form.name {
            Some(name) => validate_account_name(&name)?,
            None => account.name.clone(),
        },
        account_type: form.account_type.unwrap_or(account.account_type),
        is_liquid: form.is_liquid.unwrap_or(account.is_liquid),
        initial_balance: match form.initial_balance {
            Some(balance) => validate_balance(balance)?,
            None => account.initial_balance,
        },
    })
}

/// A route handler for editing an account.
///
/// Changing the initial balance recalculates the balance.
pub async fn edit_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
    AppJson(form): AppJson<EditAccountForm>,
) -> Result<Json<Account>, Error> {
    let connection = lock(&state.db_connection)?;
    let account = get_owned_account(account_id, user_id, &connection)?;
    let update = apply_edit(&account, form)?;

    let transaction = connection.unchecked_transaction()?;
    update_account(account_id, &update, &transaction)?;

    let account = if update.initial_balance != account.initial_balance {
        recalculate_balance(account_id, &transaction)?
    } else {
        get_account(account_id, &transaction)?
    };

    transaction.commit()?;

    Ok(Json(account))
}
