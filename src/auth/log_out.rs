//! Defines the endpoints for ending one or all sessions of a user.

use axum::{Extension, body::Bytes, extract::State, http::StatusCode};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    Error,
    auth::{
        AuthState, UserID,
        cookie::clear_refresh_cookie,
        refresh::get_refresh_token,
        refresh_token::revoke_all_refresh_tokens,
        session::end_session,
    },
    db::lock,
};

/// Revoke the presented refresh token and clear the refresh token cookie.
///
/// Logging out without a token, or with one that is already revoked, still succeeds.
pub async fn log_out(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> Result<(StatusCode, PrivateCookieJar), Error> {
    match get_refresh_token(&jar, &body) {
        Ok(raw_refresh_token) => {
            let connection = lock(&state.db_connection)?;
            end_session(&raw_refresh_token, &connection)?;
        }
        Err(Error::InvalidRefreshToken) => {}
        Err(error) => return Err(error),
    }

    Ok((
        StatusCode::NO_CONTENT,
        clear_refresh_cookie(jar, state.config.secure_cookies),
    ))
}

/// Revoke every refresh token of the authenticated user.
pub async fn log_out_all(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Result<(StatusCode, PrivateCookieJar), Error> {
    let revoked = {
        let connection = lock(&state.db_connection)?;
        revoke_all_refresh_tokens(user_id, &connection)?
    };

    tracing::info!("Revoked {revoked} sessions of user {user_id}");

    Ok((
        StatusCode::NO_CONTENT,
        clear_refresh_cookie(jar, state.config.secure_cookies),
    ))
}
