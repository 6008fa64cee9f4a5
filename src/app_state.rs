//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    auth::TokenKeys,
    config::Config,
    db::initialize,
    mailer::Mailer,
    rate_limit::{AuthRateLimiter, create_rate_limiter},
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The keys for signing and verifying access and refresh tokens.
    pub token_keys: TokenKeys,

    /// Token lifetimes, hashing cost and rate limits.
    pub config: Config,

    /// Delivers email verification and password reset messages.
    pub mailer: Arc<dyn Mailer>,

    /// Limits how often a client may hit the unauthenticated auth routes.
    pub rate_limiter: AuthRateLimiter,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `secret` is used to derive both the cookie key and the token signing key.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        secret: &str,
        config: Config,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            cookie_key: create_cookie_key(secret),
            token_keys: TokenKeys::from_secret(secret),
            rate_limiter: create_rate_limiter(config.auth_requests_per_minute),
            config,
            mailer,
            db_connection: connection,
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        state.token_keys.clone()
    }
}

impl FromRef<AppState> for AuthRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
