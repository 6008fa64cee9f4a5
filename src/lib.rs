//! Tradebook is a REST backend for tracking personal finances and a trading journal.
//!
//! Users keep accounts in any currency, record deposits, withdrawals,
//! transfers and dividends against them, and journal their FX, bond and stock
//! trades. Account balances are derived by replaying every transaction and
//! closed trade in time order, and the dashboard summarises net worth and
//! trading performance.
//!
//! All endpoints speak JSON. Sessions use short lived bearer access tokens and
//! rotating refresh tokens.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod error;
mod ledger;
mod logging;
mod mailer;
mod rate_limit;
mod routing;
mod trade;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountType, NewAccount, create_account};
pub use app_state::AppState;
pub use auth::{
    Email, PasswordHash, Role, User, UserID, ValidatedPassword, create_user,
    delete_expired_refresh_tokens, get_user_by_email, get_user_by_id, revoke_all_refresh_tokens,
    update_password,
};
pub use config::Config;
pub use db::initialize as initialize_db;
pub use error::Error;
pub use ledger::recalculate_balance;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use mailer::{LogMailer, MailMessage, Mailer};
pub use rate_limit::{AuthRateLimiter, prune_rate_limiter};
pub use routing::build_router;
pub use trade::{Direction, NewTrade, Trade, TradeDetails, create_trade};
pub use transaction::{NewTransaction, Transaction, TransactionType, create_transaction};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
