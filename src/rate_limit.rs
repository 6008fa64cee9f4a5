//! Per-client rate limiting for the unauthenticated auth routes.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::Error;

/// A rate limiter keyed by client IP address.
pub type AuthRateLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

/// Create a rate limiter that allows `requests_per_minute` requests per client.
///
/// A quota of zero is treated as one request per minute.
pub fn create_rate_limiter(requests_per_minute: u32) -> AuthRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

    Arc::new(RateLimiter::keyed(quota))
}

/// Forget clients whose quota has fully replenished and release the freed memory.
///
/// The limiter keeps an entry for every client IP it has seen, so this should
/// run periodically. Returns the number of clients still tracked.
pub fn prune_rate_limiter(limiter: &AuthRateLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();

    limiter.len()
}

/// Middleware that rejects requests with 429 once the client's quota is used up.
///
/// Clients are identified by the peer address in [ConnectInfo]. When the
/// server was not started with connect info all clients share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<AuthRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check_key(&client_ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Rate limit exceeded for {client_ip}");
            Error::RateLimited.into_response()
        }
    }
}
