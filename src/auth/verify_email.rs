//! Defines the endpoints for verifying a user's email address.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{
        AuthState, UserID,
        user::{UserResponse, get_user_by_id, mark_email_verified},
        user_token::{TokenPurpose, consume_user_token, issue_user_token},
    },
    db::lock,
    error::AppJson,
    mailer::verification_message,
};

/// The body of an email verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyEmailForm {
    /// The code from the verification email.
    pub token: String,
}

/// Redeem an email verification code.
pub async fn verify_email(
    State(state): State<AuthState>,
    AppJson(form): AppJson<VerifyEmailForm>,
) -> Result<Json<UserResponse>, Error> {
    let connection = lock(&state.db_connection)?;
    let transaction = connection.unchecked_transaction()?;

    let user_id = consume_user_token(&form.token, TokenPurpose::EmailVerification, &transaction)?;
    let mut user = get_user_by_id(user_id, &transaction)?;

    if user.email_verified_at.is_none() {
        let now = OffsetDateTime::now_utc();
        mark_email_verified(user_id, now, &transaction)?;
        user.email_verified_at = Some(now);
    }

    transaction.commit()?;
    tracing::info!("User {user_id} verified their email address");

    Ok(Json(UserResponse::from(&user)))
}

/// Send the authenticated user a fresh verification code.
pub async fn resend_verification_email(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
) -> Result<StatusCode, Error> {
    let (user, code) = {
        let connection = lock(&state.db_connection)?;
        let user = get_user_by_id(user_id, &connection)?;

        if user.email_verified_at.is_some() {
            return Err(Error::EmailAlreadyVerified);
        }

        let code = issue_user_token(user_id, TokenPurpose::EmailVerification, &connection)?;

        (user, code)
    };

    state.mailer.send(verification_message(user.email, &code))?;

    Ok(StatusCode::ACCEPTED)
}
