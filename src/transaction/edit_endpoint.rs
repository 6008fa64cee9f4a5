//! Defines the endpoint for replacing a transaction.

use axum::{Extension, Json, extract::State};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::lock,
    error::{AppJson, AppPath},
    ledger::recalculate_balances,
    transaction::{
        Transaction, TransactionForm, TransactionState, check_transaction_accounts,
        get_owned_transaction, update_transaction, validate_transaction,
    },
};

/// A route handler for replacing every field of a transaction.
///
/// The accounts touched before and after the edit are all recalculated.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppPath(transaction_id): AppPath<TransactionId>,
    AppJson(form): AppJson<TransactionForm>,
) -> Result<Json<Transaction>, Error> {
    let new_transaction = validate_transaction(form, OffsetDateTime::now_utc())?;

    let connection = lock(&state.db_connection)?;
    let old_transaction = get_owned_transaction(transaction_id, user_id, &connection)?;
    check_transaction_accounts(&new_transaction, user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let transaction = update_transaction(transaction_id, &new_transaction, &sql_transaction)?;
    recalculate_balances(
        old_transaction
            .account_ids()
            .into_iter()
            .chain(transaction.account_ids()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(transaction))
}
