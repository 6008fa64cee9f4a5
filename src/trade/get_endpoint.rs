//! Defines the endpoints for reading trades and their statistics.

use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::{
    Error,
    account::get_owned_account,
    auth::UserID,
    database_id::{AccountId, TradeId},
    db::lock,
    error::{AppPath, AppQuery},
    trade::{
        TradeResponse, TradeState, TradeStats, compute_trade_stats, get_owned_trade,
        get_trades_for_user,
    },
};

/// The query string for listing trades or their statistics.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TradeFilter {
    /// Only include trades booked against this account.
    pub account_id: Option<AccountId>,
}

/// List the authenticated user's trades, newest entry first.
pub async fn list_trades_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppQuery(filter): AppQuery<TradeFilter>,
) -> Result<Json<Vec<TradeResponse>>, Error> {
    let connection = lock(&state.db_connection)?;

    if let Some(account_id) = filter.account_id {
        get_owned_account(account_id, user_id, &connection)?;
    }

    let trades = get_trades_for_user(user_id, filter.account_id, &connection)?;

    Ok(Json(trades.into_iter().map(TradeResponse::from).collect()))
}

/// Get one of the authenticated user's trades.
pub async fn get_trade_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppPath(trade_id): AppPath<TradeId>,
) -> Result<Json<TradeResponse>, Error> {
    let connection = lock(&state.db_connection)?;

    get_owned_trade(trade_id, user_id, &connection).map(|trade| Json(trade.into()))
}

/// Get the performance statistics of the authenticated user's trades.
pub async fn get_trade_stats_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppQuery(filter): AppQuery<TradeFilter>,
) -> Result<Json<TradeStats>, Error> {
    let connection = lock(&state.db_connection)?;

    if let Some(account_id) = filter.account_id {
        get_owned_account(account_id, user_id, &connection)?;
    }

    let trades = get_trades_for_user(user_id, filter.account_id, &connection)?;

    Ok(Json(compute_trade_stats(&trades)))
}
