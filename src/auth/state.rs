use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;

use crate::{AppState, auth::TokenKeys, config::Config, mailer::Mailer};

/// The state needed by the auth endpoints.
#[derive(Clone)]
pub struct AuthState {
    /// The database connection for users and tokens.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key for encrypting the refresh token cookie.
    pub cookie_key: Key,
    /// The keys for signing and verifying tokens.
    pub token_keys: TokenKeys,
    /// Token lifetimes and the password hashing cost.
    pub config: Config,
    /// Delivers verification and password reset codes.
    pub mailer: Arc<dyn Mailer>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_key: state.cookie_key.clone(),
            token_keys: state.token_keys.clone(),
            config: state.config.clone(),
            mailer: state.mailer.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}
