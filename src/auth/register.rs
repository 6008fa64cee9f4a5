//! Defines the endpoint for registering a new user.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{
        AuthState, Email, PasswordHash, Role, ValidatedPassword, create_user,
        log_in::{SessionResponse, session_response},
        session::start_session,
        user_token::{TokenPurpose, issue_user_token},
    },
    db::lock,
    error::AppJson,
    mailer::verification_message,
};

/// The details for registering a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    /// The email address to log in with.
    pub email: String,
    /// The password in plain text.
    pub password: String,
}

/// A route handler for registering a new user.
///
/// The new user is logged in straight away and sent an email verification code.
pub async fn register_user(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    AppJson(form): AppJson<RegisterForm>,
) -> Result<(StatusCode, PrivateCookieJar, Json<SessionResponse>), Error> {
    let email = Email::new(&form.email)?;
    let password = ValidatedPassword::new(&form.password, &[email.as_str()])?;
    let password_hash = PasswordHash::new(password, state.config.password_hash_cost)?;

    let (user, tokens, code) = {
        let connection = lock(&state.db_connection)?;
        let transaction = connection.unchecked_transaction()?;

        let user = create_user(email, password_hash, Role::User, &transaction)?;
        let code = issue_user_token(user.id, TokenPurpose::EmailVerification, &transaction)?;
        let tokens = start_session(&user, &state.token_keys, &state.config, &transaction)?;

        transaction.commit()?;

        (user, tokens, code)
    };

    tracing::info!("Registered user {}", user.id);

    if let Err(error) = state
        .mailer
        .send(verification_message(user.email.clone(), &code))
    {
        tracing::error!("Could not send verification email to user {}: {error}", user.id);
    }

    let (jar, body) = session_response(&user, tokens, jar, &state.config);

    Ok((StatusCode::CREATED, jar, body))
}

#[cfg(test)]
mod register_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        auth::{COOKIE_REFRESH_TOKEN, Role, log_in::SessionResponse},
        endpoints,
        test_utils::{TEST_PASSWORD, get_test_server},
    };

    #[tokio::test]
    async fn register_user_succeeds() {
        let (server, context) = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "Foo@Bar.baz", "password": TEST_PASSWORD }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let session = response.json::<SessionResponse>();
        assert_eq!(session.user.email.as_str(), "foo@bar.baz");
        assert_eq!(session.user.role, Role::User);
        assert!(!session.user.email_verified);
        assert!(!session.access_token.is_empty());
        assert_eq!(response.cookie(COOKIE_REFRESH_TOKEN).http_only(), Some(true));
        assert!(context.mailer.last_code_for("foo@bar.baz").is_some());
    }

    #[tokio::test]
    async fn register_user_fails_with_duplicate_email() {
        let (server, _) = get_test_server();
        let body = json!({ "email": "foo@bar.baz", "password": TEST_PASSWORD });
        server
            .post(endpoints::REGISTER)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.post(endpoints::REGISTER).json(&body).await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_user_fails_with_weak_password() {
        let (server, context) = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "foo@bar.baz", "password": "password" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("too weak"));
        assert!(context.mailer.last_code_for("foo@bar.baz").is_none());
    }

    #[tokio::test]
    async fn register_user_fails_with_invalid_email() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": "not an email", "password": TEST_PASSWORD }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
