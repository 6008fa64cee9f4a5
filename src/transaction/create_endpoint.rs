//! Defines the endpoint for creating a new transaction.

use axum::{Extension, Json, extract::State, http::StatusCode};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    db::lock,
    error::AppJson,
    ledger::recalculate_balances,
    transaction::{
        Transaction, TransactionForm, TransactionState, check_transaction_accounts,
        create_transaction, validate_transaction,
    },
};

/// A route handler for recording a deposit, withdrawal, transfer or dividend.
///
/// Every account the transaction touches is recalculated before responding.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppJson(form): AppJson<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let new_transaction = validate_transaction(form, OffsetDateTime::now_utc())?;

    let connection = lock(&state.db_connection)?;
    check_transaction_accounts(&new_transaction, user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let transaction = create_transaction(&new_transaction, &sql_transaction)?;
    recalculate_balances(transaction.account_ids(), &sql_transaction)?;
    sql_transaction.commit()?;

    tracing::debug!("User {user_id} created transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}
