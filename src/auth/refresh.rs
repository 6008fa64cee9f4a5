//! Defines the endpoint for exchanging a refresh token for a new session.

use axum::{Json, body::Bytes, extract::State};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{
        AuthState,
        cookie::get_refresh_token_from_cookie,
        log_in::{SessionResponse, session_response},
        session::rotate_session,
    },
    db::lock,
};

/// The optional body of refresh and log out requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshForm {
    /// The refresh token. When absent, the refresh token cookie is used.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Get the refresh token from the request body, falling back to the cookie.
///
/// # Errors
///
/// Returns [Error::Validation] if the body is not valid JSON, or
/// [Error::InvalidRefreshToken] if neither the body nor the cookie carry a token.
pub(crate) fn get_refresh_token(jar: &PrivateCookieJar, body: &Bytes) -> Result<String, Error> {
    if !body.is_empty() {
        let form: RefreshForm =
            serde_json::from_slice(body).map_err(|error| Error::Validation(error.to_string()))?;

        if let Some(token) = form.refresh_token {
            return Ok(token);
        }
    }

    get_refresh_token_from_cookie(jar).ok_or(Error::InvalidRefreshToken)
}

/// Rotate the refresh token and issue a new access token.
pub async fn refresh(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> Result<(PrivateCookieJar, Json<SessionResponse>), Error> {
    let raw_refresh_token = get_refresh_token(&jar, &body)?;

    let (user, tokens) = {
        let connection = lock(&state.db_connection)?;
        rotate_session(
            &raw_refresh_token,
            &state.token_keys,
            &state.config,
            &connection,
        )?
    };

    Ok(session_response(&user, tokens, jar, &state.config))
}
