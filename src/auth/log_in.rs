//! Defines the endpoint for logging in with an email and password.

use axum::{Json, extract::State};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{
        AuthState, Email, User,
        cookie::set_refresh_cookie,
        session::{SessionTokens, start_session},
        user::{UserResponse, get_user_by_email},
    },
    config::Config,
    db::lock,
    error::AppJson,
};

/// The credentials for logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInForm {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// The body returned whenever a new session is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// The user the session belongs to.
    pub user: UserResponse,
    /// The token to send in the `Authorization: Bearer` header.
    pub access_token: String,
    /// The token for getting a new access token. Also set as an HTTP-only cookie.
    pub refresh_token: String,
    /// Always "Bearer".
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// When the access token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Build the response body for a new session and put the refresh token in the cookie jar.
pub(crate) fn session_response(
    user: &User,
    tokens: SessionTokens,
    jar: PrivateCookieJar,
    config: &Config,
) -> (PrivateCookieJar, Json<SessionResponse>) {
    let jar = set_refresh_cookie(
        jar,
        &tokens.refresh_token.token,
        tokens.refresh_token.expires_at,
        config.secure_cookies,
    );

    let body = SessionResponse {
        user: UserResponse::from(user),
        access_token: tokens.access_token.token,
        refresh_token: tokens.refresh_token.token,
        token_type: "Bearer".to_owned(),
        expires_in: config.access_token_duration.whole_seconds(),
        expires_at: tokens.access_token.expires_at,
    };

    (jar, Json(body))
}

/// Handler for log-in requests.
///
/// An unknown email and a wrong password give the same error, so the response
/// does not reveal which email addresses are registered.
pub async fn log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    AppJson(form): AppJson<LogInForm>,
) -> Result<(PrivateCookieJar, Json<SessionResponse>), Error> {
    let email = Email::new(&form.email).map_err(|_| Error::InvalidCredentials)?;

    let user = {
        let connection = lock(&state.db_connection)?;
        get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    if !user.password_hash.verify(&form.password)? {
        tracing::debug!("Wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let tokens = {
        let connection = lock(&state.db_connection)?;
        start_session(&user, &state.token_keys, &state.config, &connection)?
    };

    tracing::info!("User {} logged in", user.id);

    Ok(session_response(&user, tokens, jar, &state.config))
}

#[cfg(test)]
mod log_in_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        auth::{COOKIE_REFRESH_TOKEN, log_in::SessionResponse},
        endpoints,
        test_utils::{TEST_PASSWORD, get_test_server, register_user},
    };

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (server, _) = get_test_server();
        register_user(&server, "foo@bar.baz").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "foo@bar.baz", "password": TEST_PASSWORD }))
            .await;

        response.assert_status_ok();
        let session = response.json::<SessionResponse>();
        assert_eq!(session.user.email.as_str(), "foo@bar.baz");
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.expires_in, 15 * 60);
        let cookie = response.cookie(COOKIE_REFRESH_TOKEN);
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[tokio::test]
    async fn email_is_case_insensitive() {
        let (server, _) = get_test_server();
        register_user(&server, "foo@bar.baz").await;

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "FOO@bar.baz", "password": TEST_PASSWORD }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let (server, _) = get_test_server();
        register_user(&server, "foo@bar.baz").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "foo@bar.baz", "password": "wrongpassword" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "nobody@bar.baz", "password": TEST_PASSWORD }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_field() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "foo@bar.baz" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
