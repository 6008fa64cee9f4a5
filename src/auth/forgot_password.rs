//! Defines the endpoints for resetting a forgotten password with an emailed code.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{
        AuthState, Email, PasswordHash, ValidatedPassword,
        refresh_token::revoke_all_refresh_tokens,
        user::{get_user_by_email, get_user_by_id, mark_email_verified, update_password},
        user_token::{TokenPurpose, consume_user_token, issue_user_token},
    },
    db::lock,
    error::AppJson,
    mailer::password_reset_message,
};

/// The body of a forgotten password request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordForm {
    /// The email address of the account to reset.
    pub email: String,
}

/// Mail a password reset code if `email` belongs to a user.
///
/// The response is always 202 so it cannot be used to find registered emails.
pub async fn forgot_password(
    State(state): State<AuthState>,
    AppJson(form): AppJson<ForgotPasswordForm>,
) -> Result<StatusCode, Error> {
    let Ok(email) = Email::new(&form.email) else {
        return Ok(StatusCode::ACCEPTED);
    };

    let issued = {
        let connection = lock(&state.db_connection)?;

        match get_user_by_email(&email, &connection) {
            Ok(user) => {
                let code = issue_user_token(user.id, TokenPurpose::PasswordReset, &connection)?;
                Some((user, code))
            }
            Err(Error::NotFound) => None,
            Err(error) => return Err(error),
        }
    };

    match issued {
        Some((user, code)) => {
            tracing::info!("Issued password reset code for user {}", user.id);

            if let Err(error) = state.mailer.send(password_reset_message(user.email, &code)) {
                tracing::error!("Could not send password reset email to user {}: {error}", user.id);
            }
        }
        None => tracing::debug!("Password reset requested for unregistered email"),
    }

    Ok(StatusCode::ACCEPTED)
}

/// The body of a password reset request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordForm {
    /// The code from the password reset email.
    pub token: String,
    /// The password to switch to.
    pub new_password: String,
}

/// Redeem a password reset code, set the new password and end every session of the user.
///
/// Receiving the code also proves the user owns their email address.
/// The password is hashed without holding the database lock.
pub async fn reset_password(
    State(state): State<AuthState>,
    AppJson(form): AppJson<ResetPasswordForm>,
) -> Result<StatusCode, Error> {
    let (user, new_password) = {
        let connection = lock(&state.db_connection)?;
        // Dropping the transaction on a weak password keeps the code usable.
        let transaction = connection.unchecked_transaction()?;

        let user_id = consume_user_token(&form.token, TokenPurpose::PasswordReset, &transaction)?;
        let user = get_user_by_id(user_id, &transaction)?;
        let new_password = ValidatedPassword::new(&form.new_password, &[user.email.as_str()])?;

        transaction.commit()?;
        (user, new_password)
    };

    let password_hash = PasswordHash::new(new_password, state.config.password_hash_cost)?;

    let revoked = {
        let connection = lock(&state.db_connection)?;
        let transaction = connection.unchecked_transaction()?;

        update_password(user.id, &password_hash, &transaction)?;
        let revoked = revoke_all_refresh_tokens(user.id, &transaction)?;

        if user.email_verified_at.is_none() {
            mark_email_verified(user.id, OffsetDateTime::now_utc(), &transaction)?;
        }

        transaction.commit()?;
        revoked
    };

    tracing::info!(
        "User {} reset their password, revoked {revoked} sessions",
        user.id
    );

    Ok(StatusCode::NO_CONTENT)
}
