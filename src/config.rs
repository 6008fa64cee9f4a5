//! Tunable settings for sessions, password hashing and rate limiting.

use time::Duration;

use crate::auth::PasswordHash;

/// The default lifetime of an access token.
pub const DEFAULT_ACCESS_TOKEN_DURATION: Duration = Duration::minutes(15);
/// The default lifetime of a refresh token.
pub const DEFAULT_REFRESH_TOKEN_DURATION: Duration = Duration::days(30);
/// The default number of requests per minute a client may send to the auth routes.
pub const DEFAULT_AUTH_REQUESTS_PER_MINUTE: u32 = 30;

/// Settings that control how the server issues and checks credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How long an access token is valid for.
    pub access_token_duration: Duration,
    /// How long a refresh token is valid for.
    pub refresh_token_duration: Duration,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
    /// Quota for the unauthenticated auth routes, per client IP.
    pub auth_requests_per_minute: u32,
    /// Whether the refresh token cookie is only sent over HTTPS.
    pub secure_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token_duration: DEFAULT_ACCESS_TOKEN_DURATION,
            refresh_token_duration: DEFAULT_REFRESH_TOKEN_DURATION,
            password_hash_cost: PasswordHash::DEFAULT_COST,
            auth_requests_per_minute: DEFAULT_AUTH_REQUESTS_PER_MINUTE,
            secure_cookies: true,
        }
    }
}
