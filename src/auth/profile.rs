//! Defines the endpoints for the authenticated user's own profile.

use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{
        AuthState, PasswordHash, UserID, ValidatedPassword,
        cookie::clear_refresh_cookie,
        refresh_token::revoke_all_refresh_tokens,
        user::{UserResponse, get_user_by_id, update_password},
    },
    db::lock,
    error::AppJson,
};

/// Get the authenticated user.
pub async fn get_me(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserResponse>, Error> {
    let connection = lock(&state.db_connection)?;

    // The token can outlive its user.
    let user = get_user_by_id(user_id, &connection).map_err(|error| match error {
        Error::NotFound => Error::Unauthorized,
        error => error,
    })?;

    Ok(Json(UserResponse::from(&user)))
}

/// The body of a password change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordForm {
    /// The password the user currently logs in with.
    pub current_password: String,
    /// The password to switch to.
    pub new_password: String,
}

/// Change the authenticated user's password and end all of their sessions.
pub async fn change_password(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    AppJson(form): AppJson<ChangePasswordForm>,
) -> Result<(StatusCode, PrivateCookieJar), Error> {
    let user = {
        let connection = lock(&state.db_connection)?;
        get_user_by_id(user_id, &connection)?
    };

    if !user.password_hash.verify(&form.current_password)? {
        return Err(Error::InvalidCredentials);
    }

    let new_password = ValidatedPassword::new(&form.new_password, &[user.email.as_str()])?;
    let password_hash = PasswordHash::new(new_password, state.config.password_hash_cost)?;

    {
        let connection = lock(&state.db_connection)?;
        let transaction = connection.unchecked_transaction()?;
        update_password(user_id, &password_hash, &transaction)?;
        revoke_all_refresh_tokens(user_id, &transaction)?;
        transaction.commit()?;
    }

    tracing::info!("User {user_id} changed their password");

    Ok((
        StatusCode::NO_CONTENT,
        clear_refresh_cookie(jar, state.config.secure_cookies),
    ))
}
