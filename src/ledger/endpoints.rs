//! Defines the endpoints for inspecting and repairing an account's ledger.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, get_owned_account},
    auth::UserID,
    database_id::AccountId,
    db::lock,
    error::AppPath,
    ledger::{BalanceSnapshot, Ledger, get_balance_history, get_ledger, recalculate_balance},
};

/// The state needed to read an account's ledger.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The database connection for reading transactions and trades.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get every balance change of an account with its running balance.
pub async fn get_ledger_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
) -> Result<Json<Ledger>, Error> {
    let connection = lock(&state.db_connection)?;
    get_owned_account(account_id, user_id, &connection)?;

    get_ledger(account_id, &connection).map(Json)
}

/// Get the balance snapshots of an account, oldest first.
pub async fn get_balance_history_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
) -> Result<Json<Vec<BalanceSnapshot>>, Error> {
    let connection = lock(&state.db_connection)?;
    get_owned_account(account_id, user_id, &connection)?;

    get_balance_history(account_id, &connection).map(Json)
}

/// Replay an account's history and store the result.
pub async fn recalculate_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    AppPath(account_id): AppPath<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock(&state.db_connection)?;
    get_owned_account(account_id, user_id, &connection)?;

    let account = recalculate_balance(account_id, &connection)?;
    tracing::info!("User {user_id} recalculated the balance of account {account_id}");

    Ok(Json(account))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::{
        account::Account,
        endpoints::{self, format_endpoint},
        ledger::{BalanceSnapshot, EntryKind, Ledger},
        test_utils::{create_account, deposit, get_test_server, register_user},
    };

    #[tokio::test]
    async fn ledger_lists_running_balance() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let account = create_account(&server, &session.access_token, "Everyday", "NZD").await;
        deposit(&server, &session.access_token, account.id, 100.0).await;
        deposit(&server, &session.access_token, account.id, 50.0).await;

        let response = server
            .get(&format_endpoint(endpoints::ACCOUNT_LEDGER, account.id))
            .authorization_bearer(&session.access_token)
            .await;

        response.assert_status_ok();
        let ledger = response.json::<Ledger>();
        let balances: Vec<f64> = ledger.lines.iter().map(|line| line.balance).collect();
        assert_eq!(balances, vec![100.0, 150.0]);
        assert!(ledger.lines.iter().all(|line| line.kind == EntryKind::Transaction));
        assert_eq!(ledger.balance, 150.0);
    }

    #[tokio::test]
    async fn balance_history_grows_with_each_mutation() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let account = create_account(&server, &session.access_token, "Everyday", "NZD").await;
        deposit(&server, &session.access_token, account.id, 100.0).await;

        let response = server
            .get(&format_endpoint(endpoints::ACCOUNT_BALANCE_HISTORY, account.id))
            .authorization_bearer(&session.access_token)
            .await;

        response.assert_status_ok();
        let balances: Vec<f64> = response
            .json::<Vec<BalanceSnapshot>>()
            .iter()
            .map(|snapshot| snapshot.balance)
            .collect();
        assert_eq!(balances, vec![0.0, 100.0]);
    }

    #[tokio::test]
    async fn recalculate_repairs_stored_balance() {
        let (server, context) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let account = create_account(&server, &session.access_token, "Everyday", "NZD").await;
        deposit(&server, &session.access_token, account.id, 100.0).await;
        {
            let connection = context.state.db_connection.lock().unwrap();
            connection
                .execute(
                    "UPDATE account SET balance = 12345 WHERE id = ?1",
                    (account.id,),
                )
                .unwrap();
        }

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_RECALCULATE, account.id))
            .authorization_bearer(&session.access_token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Account>().balance, 100.0);
    }

    #[tokio::test]
    async fn other_users_ledger_is_forbidden() {
        let (server, _) = get_test_server();
        let owner = register_user(&server, "foo@bar.baz").await;
        let intruder = register_user(&server, "bar@baz.qux").await;
        let account = create_account(&server, &owner.access_token, "Everyday", "NZD").await;

        for path in [
            endpoints::ACCOUNT_LEDGER,
            endpoints::ACCOUNT_BALANCE_HISTORY,
        ] {
            server
                .get(&format_endpoint(path, account.id))
                .authorization_bearer(&intruder.access_token)
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }

        server
            .post(&format_endpoint(endpoints::ACCOUNT_RECALCULATE, account.id))
            .authorization_bearer(&intruder.access_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
