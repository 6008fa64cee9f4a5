//! Defines the endpoints for reading transactions.

use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::{
    Error,
    account::get_owned_account,
    auth::UserID,
    database_id::{AccountId, TransactionId},
    db::lock,
    error::{AppPath, AppQuery},
    transaction::{
        Transaction, TransactionQuery, TransactionState, get_owned_transaction,
        query_transactions,
    },
};

/// The number of transactions returned when the client does not ask for a limit.
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// The most transactions returned by one request.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// The query string for listing transactions.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Only list transactions that touch this account.
    pub account_id: Option<AccountId>,
    /// The page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub limit: Option<i64>,
    /// How many transactions to skip.
    pub offset: Option<i64>,
}

impl TryFrom<ListTransactionsQuery> for TransactionQuery {
    type Error = Error;

    fn try_from(query: ListTransactionsQuery) -> Result<Self, Self::Error> {
        let offset = query.offset.unwrap_or(0);

        if offset < 0 {
            return Err(Error::Validation("offset cannot be negative".to_owned()));
        }

        Ok(TransactionQuery {
            account_id: query.account_id,
            limit: query
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            offset,
        })
    }
}

/// List the authenticated user's transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppQuery(query): AppQuery<ListTransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let query = TransactionQuery::try_from(query)?;
    let connection = lock(&state.db_connection)?;

    if let Some(account_id) = query.account_id {
        get_owned_account(account_id, user_id, &connection)?;
    }

    query_transactions(user_id, query, &connection).map(Json)
}

/// Get one of the authenticated user's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppPath(transaction_id): AppPath<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock(&state.db_connection)?;

    get_owned_transaction(transaction_id, user_id, &connection).map(Json)
}
