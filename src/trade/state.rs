use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

/// The state needed by the trade endpoints.
#[derive(Debug, Clone)]
pub struct TradeState {
    /// The database connection for managing trades.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TradeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
