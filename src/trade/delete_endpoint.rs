//! Defines the endpoint for deleting a trade.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    Error,
    auth::UserID,
    database_id::TradeId,
    db::lock,
    error::AppPath,
    ledger::recalculate_balance,
    trade::{TradeState, delete_trade, get_owned_trade},
};

/// A route handler for deleting a trade and recalculating its account.
pub async fn delete_trade_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppPath(trade_id): AppPath<TradeId>,
) -> Result<StatusCode, Error> {
    let connection = lock(&state.db_connection)?;
    let trade = get_owned_trade(trade_id, user_id, &connection)?;

    let transaction = connection.unchecked_transaction()?;
    delete_trade(trade_id, &transaction)?;
    recalculate_balance(trade.account_id, &transaction)?;
    transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

    use crate::{
        account::Account,
        endpoints::{self, format_endpoint},
        test_utils::{create_account, get_test_server, register_user},
        trade::TradeResponse,
    };

    #[tokio::test]
    async fn delete_reverses_realized_pnl() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let token = &session.access_token;
        let account = create_account(&server, token, "Brokerage", "USD").await;
        let now = OffsetDateTime::now_utc();
        let trade = server
            .post(endpoints::TRADES)
            .authorization_bearer(token)
            .json(&json!({
                "account_id": account.id,
                "instrument": "AAPL",
                "direction": "LONG",
                "type": "STOCK",
                "entry_price": 100.0,
                "exit_price": 90.0,
                "quantity": 1.0,
                "entry_at": (now - Duration::days(2)).format(&Rfc3339).unwrap(),
                "exit_at": (now - Duration::days(1)).format(&Rfc3339).unwrap(),
            }))
            .await
            .json::<TradeResponse>();
        let path = format_endpoint(endpoints::TRADE, trade.trade.id);

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
        assert_eq!(account.balance, 0.0);
    }

    #[tokio::test]
    async fn cannot_delete_other_users_trade() {
        let (server, _) = get_test_server();
        let owner = register_user(&server, "foo@bar.baz").await;
        let intruder = register_user(&server, "bar@baz.qux").await;
        let account = create_account(&server, &owner.access_token, "Brokerage", "USD").await;
        let now = OffsetDateTime::now_utc();
        let trade = server
            .post(endpoints::TRADES)
            .authorization_bearer(&owner.access_token)
            .json(&json!({
                "account_id": account.id,
                "instrument": "AAPL",
                "direction": "LONG",
                "type": "STOCK",
                "entry_price": 100.0,
                "exit_price": 110.0,
                "quantity": 2.0,
                "entry_at": (now - Duration::days(2)).format(&Rfc3339).unwrap(),
                "exit_at": (now - Duration::days(1)).format(&Rfc3339).unwrap(),
            }))
            .await
            .json::<TradeResponse>();
        let path = format_endpoint(endpoints::TRADE, trade.trade.id);

        server
            .delete(&path)
            .authorization_bearer(&intruder.access_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .get(&path)
            .authorization_bearer(&owner.access_token)
            .await
            .assert_status_ok();
        let account = server
            .get(&format_endpoint(endpoints::ACCOUNT, account.id))
            .authorization_bearer(&owner.access_token)
            .await
            .json::<Account>();
        assert_eq!(account.balance, 20.0);
    }

    #[tokio::test]
    async fn missing_trade_is_not_found() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;

        server
            .delete(&format_endpoint(endpoints::TRADE, 999))
            .authorization_bearer(&session.access_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
