//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, edit_account_endpoint,
        get_account_endpoint, get_status_history_endpoint, list_accounts_endpoint,
        set_account_status_endpoint,
    },
    auth::{
        auth_guard, change_password, forgot_password, get_me, log_in, log_out, log_out_all,
        refresh, register_user, resend_verification_email, reset_password, verify_email,
    },
    dashboard::{get_dashboard_summary, get_net_worth_series},
    endpoints,
    ledger::{get_balance_history_endpoint, get_ledger_endpoint, recalculate_endpoint},
    rate_limit::rate_limit_middleware,
    trade::{
        close_trade_endpoint, create_trade_endpoint, delete_trade_endpoint, edit_trade_endpoint,
        get_trade_endpoint, get_trade_stats_endpoint, list_trades_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_transaction_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// The unauthenticated auth routes share a per-client rate limit, and every
/// route that reads or changes a user's data requires a bearer access token.
pub fn build_router(state: AppState) -> Router {
    let rate_limited_routes = Router::new()
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::REFRESH, post(refresh))
        .route(endpoints::VERIFY_EMAIL, post(verify_email))
        .route(endpoints::FORGOT_PASSWORD, post(forgot_password))
        .route(endpoints::RESET_PASSWORD, post(reset_password))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_OUT, post(log_out))
        .merge(rate_limited_routes);

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT_ALL, post(log_out_all))
        .route(endpoints::ME, get(get_me))
        .route(
            endpoints::RESEND_VERIFICATION,
            post(resend_verification_email),
        )
        .route(endpoints::CHANGE_PASSWORD, post(change_password))
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .put(edit_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT_STATUS,
            post(set_account_status_endpoint),
        )
        .route(
            endpoints::ACCOUNT_STATUS_HISTORY,
            get(get_status_history_endpoint),
        )
        .route(
            endpoints::ACCOUNT_BALANCE_HISTORY,
            get(get_balance_history_endpoint),
        )
        .route(endpoints::ACCOUNT_LEDGER, get(get_ledger_endpoint))
        .route(endpoints::ACCOUNT_RECALCULATE, post(recalculate_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRADES,
            get(list_trades_endpoint).post(create_trade_endpoint),
        )
        .route(endpoints::TRADE_STATS, get(get_trade_stats_endpoint))
        .route(
            endpoints::TRADE,
            get(get_trade_endpoint)
                .put(edit_trade_endpoint)
                .delete(delete_trade_endpoint),
        )
        .route(endpoints::CLOSE_TRADE, post(close_trade_endpoint))
        .route(endpoints::DASHBOARD_SUMMARY, get(get_dashboard_summary))
        .route(endpoints::DASHBOARD_NET_WORTH, get(get_net_worth_series))
        .layer(middleware::from_fn_with_state(
            state.token_keys.clone(),
            auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        Json(json!({ "message": "I'm a teapot" })),
    )
        .into_response()
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
