//! Defines the endpoints for replacing and closing trades.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::TradeId,
    db::lock,
    error::{AppJson, AppPath},
    ledger::recalculate_balances,
    trade::{
        TradeForm, TradeResponse, TradeState, check_trade_account, close_trade_details,
        get_owned_trade, update_trade, validate_trade,
    },
};

/// A route handler for replacing every field of a trade, including its type.
///
/// Moving a trade to another account recalculates both accounts.
pub async fn edit_trade_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppPath(trade_id): AppPath<TradeId>,
    AppJson(form): AppJson<TradeForm>,
) -> Result<Json<TradeResponse>, Error> {
    let new_trade = validate_trade(form, OffsetDateTime::now_utc())?;

    let connection = lock(&state.db_connection)?;
    let old_trade = get_owned_trade(trade_id, user_id, &connection)?;
    check_trade_account(&new_trade, user_id, &connection)?;

    let transaction = connection.unchecked_transaction()?;
    let trade = update_trade(trade_id, &new_trade, &transaction)?;
    recalculate_balances([old_trade.account_id, trade.account_id], &transaction)?;
    transaction.commit()?;

    Ok(Json(trade.into()))
}

/// The request body for closing a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseTradeForm {
    /// The price the position was closed at.
    pub exit_price: f64,
    /// When the position was closed. Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub exit_at: Option<OffsetDateTime>,
}

/// A route handler for closing an open trade, which books its profit or loss.
pub async fn close_trade_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppPath(trade_id): AppPath<TradeId>,
    AppJson(form): AppJson<CloseTradeForm>,
) -> Result<Json<TradeResponse>, Error> {
    let connection = lock(&state.db_connection)?;
    let open_trade = get_owned_trade(trade_id, user_id, &connection)?;
    let closed_trade = close_trade_details(
        &open_trade,
        form.exit_price,
        form.exit_at,
        OffsetDateTime::now_utc(),
    )?;

    let transaction = connection.unchecked_transaction()?;
    let trade = update_trade(trade_id, &closed_trade, &transaction)?;
    recalculate_balances([trade.account_id], &transaction)?;
    transaction.commit()?;

    tracing::info!("User {user_id} closed trade {trade_id}");

    Ok(Json(trade.into()))
}
