//! The session lifecycle: issuing, rotating and ending access/refresh token pairs.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{
        User,
        refresh_token::{
            find_refresh_token, revoke_all_refresh_tokens, revoke_refresh_token,
            store_refresh_token,
        },
        token::{SignedToken, TokenKeys, TokenKind, decode_token, encode_token, hash_token},
        user::get_user_by_id,
    },
    config::Config,
    database_id::DatabaseId,
};

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTokens {
    /// The short-lived token for authenticating requests.
    pub access_token: SignedToken,
    /// The long-lived token for getting new access tokens.
    pub refresh_token: SignedToken,
    /// The ID of the stored refresh token.
    pub refresh_token_id: DatabaseId,
}

/// Issue a new access/refresh token pair for `user` and store the refresh token hash.
///
/// # Errors
///
/// Returns an error if a token could not be signed or stored.
pub fn start_session(
    user: &User,
    keys: &TokenKeys,
    config: &Config,
    connection: &Connection,
) -> Result<SessionTokens, Error> {
    let access_token = encode_token(
        user.id,
        user.role,
        TokenKind::Access,
        config.access_token_duration,
        keys,
    )?;
    let refresh_token = encode_token(
        user.id,
        user.role,
        TokenKind::Refresh,
        config.refresh_token_duration,
        keys,
    )?;

    let stored = store_refresh_token(
        user.id,
        &hash_token(&refresh_token.token),
        refresh_token.expires_at,
        connection,
    )?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
        refresh_token_id: stored.id,
    })
}

/// Exchange a refresh token for a new token pair, revoking the old refresh token.
///
/// Presenting a refresh token that has already been revoked means it was
/// either stolen or replayed, so every session of its user is revoked.
///
/// # Errors
///
/// Returns [Error::InvalidRefreshToken] if the token has a bad signature, has
/// expired, is unknown, or was revoked.
pub fn rotate_session(
    raw_refresh_token: &str,
    keys: &TokenKeys,
    config: &Config,
    connection: &Connection,
) -> Result<(User, SessionTokens), Error> {
    let claims = decode_token(raw_refresh_token, TokenKind::Refresh, keys)?;
    let transaction = connection.unchecked_transaction()?;

    let stored = find_refresh_token(&hash_token(raw_refresh_token), &transaction)?
        .filter(|stored| stored.user_id == claims.sub)
        .ok_or(Error::InvalidRefreshToken)?;

    if stored.revoked_at.is_some() {
        tracing::warn!(
            "Revoked refresh token {} was presented again, revoking all sessions of user {}",
            stored.id,
            stored.user_id
        );
        revoke_all_refresh_tokens(stored.user_id, &transaction)?;
        transaction.commit()?;

        return Err(Error::InvalidRefreshToken);
    }

    if !stored.is_usable(OffsetDateTime::now_utc()) {
        return Err(Error::InvalidRefreshToken);
    }

    let user = get_user_by_id(stored.user_id, &transaction).map_err(|error| match error {
        Error::NotFound => Error::InvalidRefreshToken,
        error => error,
    })?;

    let tokens = start_session(&user, keys, config, &transaction)?;
    revoke_refresh_token(stored.id, Some(tokens.refresh_token_id), &transaction)?;
    transaction.commit()?;

    Ok((user, tokens))
}

/// Revoke the refresh token, if it is known.
///
/// Ending a session that does not exist or has already ended is not an error.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the token could not be revoked.
pub fn end_session(raw_refresh_token: &str, connection: &Connection) -> Result<(), Error> {
    if let Some(stored) = find_refresh_token(&hash_token(raw_refresh_token), connection)? {
        revoke_refresh_token(stored.id, None, connection)?;
    }

    Ok(())
}
