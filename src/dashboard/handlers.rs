//! Dashboard HTTP handlers.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::{get_accounts_for_user, validate_currency},
    auth::UserID,
    dashboard::aggregation::{
        CurrencySummary, NetWorthSeries, build_net_worth_series, summarise_by_currency,
    },
    db::lock,
    error::AppQuery,
    ledger::get_balance_history_for_currency,
    trade::{TradeStats, compute_trade_stats, get_trades_for_user},
};

/// The state needed for the dashboard endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading accounts, trades and snapshots.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Net worth per currency and trading performance across every account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Totals of the active accounts, one row per currency.
    pub currencies: Vec<CurrencySummary>,
    /// Statistics over every trade of the user.
    pub trading: TradeStats,
}

/// Get the net worth and trading totals of the authenticated user.
pub async fn get_dashboard_summary(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<DashboardSummary>, Error> {
    let connection = lock(&state.db_connection)?;

    let accounts = get_accounts_for_user(user_id, &connection)?;
    let trades = get_trades_for_user(user_id, None, &connection)?;

    Ok(Json(DashboardSummary {
        currencies: summarise_by_currency(&accounts),
        trading: compute_trade_stats(&trades),
    }))
}

/// The query string for the net worth time series.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetWorthQuery {
    /// Only build the series for this currency.
    pub currency: Option<String>,
}

/// Get the daily net worth of the authenticated user, one series per currency.
pub async fn get_net_worth_series(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    AppQuery(query): AppQuery<NetWorthQuery>,
) -> Result<Json<Vec<NetWorthSeries>>, Error> {
    let connection = lock(&state.db_connection)?;

    let currencies: BTreeSet<String> = match query.currency {
        Some(currency) => BTreeSet::from([validate_currency(&currency)?]),
        None => get_accounts_for_user(user_id, &connection)?
            .into_iter()
            .filter(|account| account.is_active)
            .map(|account| account.currency)
            .collect(),
    };

    currencies
        .iter()
        .map(|currency| {
            let snapshots = get_balance_history_for_currency(user_id, currency, &connection)?;
            Ok(build_net_worth_series(currency, &snapshots))
        })
        .collect::<Result<Vec<_>, Error>>()
        .map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

    use crate::{
        dashboard::{DashboardSummary, NetWorthSeries},
        endpoints::{self, format_endpoint},
        test_utils::{create_account, deposit, get_test_server, register_user},
    };

    #[tokio::test]
    async fn summary_totals_active_accounts_and_trades() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let token = &session.access_token;
        let everyday = create_account(&server, token, "Everyday", "NZD").await;
        let brokerage = create_account(&server, token, "Brokerage", "USD").await;
        let closed = create_account(&server, token, "Closed", "NZD").await;
        deposit(&server, token, everyday.id, 100.0).await;
        deposit(&server, token, closed.id, 1000.0).await;
        server
            .post(&format_endpoint(endpoints::ACCOUNT_STATUS, closed.id))
            .authorization_bearer(token)
            .json(&json!({ "is_active": false }))
            .await
            .assert_status_ok();
        let now = OffsetDateTime::now_utc();
        server
            .post(endpoints::TRADES)
            .authorization_bearer(token)
            .json(&json!({
                "account_id": brokerage.id,
                "instrument": "AAPL",
                "direction": "LONG",
                "type": "STOCK",
                "entry_price": 10.0,
                "exit_price": 12.0,
                "quantity": 10.0,
                "entry_at": (now - Duration::days(2)).format(&Rfc3339).unwrap(),
                "exit_at": (now - Duration::days(1)).format(&Rfc3339).unwrap(),
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(endpoints::DASHBOARD_SUMMARY)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        let summary = response.json::<DashboardSummary>();
        let rows: Vec<(String, f64, usize)> = summary
            .currencies
            .into_iter()
            .map(|row| (row.currency, row.net_worth, row.account_count))
            .collect();
        assert_eq!(
            rows,
            vec![("NZD".to_owned(), 100.0, 1), ("USD".to_owned(), 20.0, 1)]
        );
        assert_eq!(summary.trading.closed_trades, 1);
        assert_eq!(summary.trading.net_pnl, 20.0);
    }

    #[tokio::test]
    async fn net_worth_has_a_series_per_currency() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let token = &session.access_token;
        let everyday = create_account(&server, token, "Everyday", "NZD").await;
        let savings = create_account(&server, token, "Savings", "NZD").await;
        create_account(&server, token, "Travel", "USD").await;
        deposit(&server, token, everyday.id, 100.0).await;
        deposit(&server, token, savings.id, 50.0).await;

        let all = server
            .get(endpoints::DASHBOARD_NET_WORTH)
            .authorization_bearer(token)
            .await
            .json::<Vec<NetWorthSeries>>();
        let nzd_only = server
            .get(endpoints::DASHBOARD_NET_WORTH)
            .add_query_param("currency", "nzd")
            .authorization_bearer(token)
            .await
            .json::<Vec<NetWorthSeries>>();

        let currencies: Vec<&str> = all.iter().map(|series| series.currency.as_str()).collect();
        assert_eq!(currencies, vec!["NZD", "USD"]);
        assert_eq!(nzd_only.len(), 1);
        assert_eq!(
            nzd_only[0].points.last().map(|point| point.value),
            Some(150.0)
        );
    }

    #[tokio::test]
    async fn net_worth_rejects_invalid_currency() {
        let (server, _) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;

        server
            .get(endpoints::DASHBOARD_NET_WORTH)
            .add_query_param("currency", "dollars")
            .authorization_bearer(&session.access_token)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
