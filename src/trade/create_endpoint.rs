//! Defines the endpoint for recording a new trade.

use axum::{Extension, Json, extract::State, http::StatusCode};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    db::lock,
    error::AppJson,
    ledger::recalculate_balance,
    trade::{
        TradeForm, TradeResponse, TradeState, check_trade_account, create_trade, validate_trade,
    },
};

/// A route handler for recording an open or closed trade.
pub async fn create_trade_endpoint(
    State(state): State<TradeState>,
    Extension(user_id): Extension<UserID>,
    AppJson(form): AppJson<TradeForm>,
) -> Result<(StatusCode, Json<TradeResponse>), Error> {
    let new_trade = validate_trade(form, OffsetDateTime::now_utc())?;

    let connection = lock(&state.db_connection)?;
    check_trade_account(&new_trade, user_id, &connection)?;

    let transaction = connection.unchecked_transaction()?;
    let trade = create_trade(&new_trade, &transaction)?;
    recalculate_balance(trade.account_id, &transaction)?;
    transaction.commit()?;

    tracing::debug!("User {user_id} created trade {}", trade.id);

    Ok((StatusCode::CREATED, Json(trade.into())))
}
