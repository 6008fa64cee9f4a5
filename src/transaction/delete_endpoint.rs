//! Defines the endpoint for deleting a transaction.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::lock,
    error::AppPath,
    ledger::recalculate_balances,
    transaction::{TransactionState, delete_transaction, get_owned_transaction},
};

/// A route handler for deleting a transaction and recalculating the accounts it touched.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppPath(transaction_id): AppPath<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock(&state.db_connection)?;
    let transaction = get_owned_transaction(transaction_id, user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_transaction(transaction_id, &sql_transaction)?;
    recalculate_balances(transaction.account_ids(), &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::{
        account::Account,
        endpoints::{self, format_endpoint},
        test_utils::{create_account, deposit, get_test_server, register_user},
    };

    #[tokio::test]
    async fn delete_restores_balance() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let token = &session.access_token;
        let account = create_account(&server, token, "Everyday", "NZD").await;
        deposit(&server, token, account.id, 10.0).await;
        let transaction = deposit(&server, token, account.id, 100.0).await;
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        server
            .delete(&path)
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&path)
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let account = server
            .get(&format_endpoint(endpoints::ACCOUNT, account.id))
            .authorization_bearer(token)
            .await
            .json::<Account>();
        assert_eq!(account.balance, 10.0);
    }

    #[tokio::test]
    async fn cannot_delete_other_users_transaction() {
        let (server, _) = get_test_server();
        let owner = register_user(&server, "foo@bar.baz").await;
        let intruder = register_user(&server, "bar@baz.qux").await;
        let account = create_account(&server, &owner.access_token, "Everyday", "NZD").await;
        let transaction = deposit(&server, &owner.access_token, account.id, 100.0).await;

        server
            .delete(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .authorization_bearer(&intruder.access_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
