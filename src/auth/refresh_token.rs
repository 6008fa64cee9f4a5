//! Storage for refresh tokens.
//!
//! Only the SHA-256 hash of a refresh token is stored, so a leaked database
//! does not leak usable sessions.

use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// A stored refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    /// The ID of the stored token.
    pub id: DatabaseId,
    /// The user the token was issued to.
    pub user_id: UserID,
    /// The hex encoded SHA-256 hash of the token.
    pub token_hash: String,
    /// When the token stops being accepted.
    pub expires_at: OffsetDateTime,
    /// When the token was revoked, either by log out or by rotation.
    pub revoked_at: Option<OffsetDateTime>,
    /// The token that replaced this one when it was rotated.
    pub replaced_by: Option<DatabaseId>,
    /// When the token was issued.
    pub created_at: OffsetDateTime,
}

impl RefreshToken {
    /// Whether the token may be exchanged for a new session at `now`.
    pub fn is_usable(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Create the refresh token table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_refresh_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS refresh_token (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            revoked_at TEXT,
            replaced_by INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_refresh_token(row: &Row) -> Result<RefreshToken, rusqlite::Error> {
    Ok(RefreshToken {
        id: row.get(0)?,
        user_id: row.get(1)?,
        token_hash: row.get(2)?,
        expires_at: row.get(3)?,
        revoked_at: row.get(4)?,
        replaced_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Store the hash of a newly issued refresh token.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the token could not be inserted.
pub fn store_refresh_token(
    user_id: UserID,
    token_hash: &str,
    expires_at: OffsetDateTime,
    connection: &Connection,
) -> Result<RefreshToken, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO refresh_token (user_id, token_hash, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        (user_id, token_hash, expires_at, created_at),
    )?;

    Ok(RefreshToken {
        id: connection.last_insert_rowid(),
        user_id,
        token_hash: token_hash.to_owned(),
        expires_at,
        revoked_at: None,
        replaced_by: None,
        created_at,
    })
}

/// Find a stored refresh token by its hash.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the query failed.
pub fn find_refresh_token(
    token_hash: &str,
    connection: &Connection,
) -> Result<Option<RefreshToken>, Error> {
    connection
        .query_row(
            "SELECT id, user_id, token_hash, expires_at, revoked_at, replaced_by, created_at
             FROM refresh_token WHERE token_hash = ?1",
            (token_hash,),
            map_row_to_refresh_token,
        )
        .optional()
        .map_err(Error::from)
}

/// Mark a refresh token as revoked, optionally linking it to the token that replaced it.
///
/// Revoking an already revoked token keeps the original revocation time.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the update failed.
pub fn revoke_refresh_token(
    id: DatabaseId,
    replaced_by: Option<DatabaseId>,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE refresh_token
         SET revoked_at = COALESCE(revoked_at, ?1), replaced_by = COALESCE(?2, replaced_by)
         WHERE id = ?3",
        (OffsetDateTime::now_utc(), replaced_by, id),
    )?;

    Ok(())
}

/// Revoke every live refresh token of the user, returning how many were revoked.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the update failed.
pub fn revoke_all_refresh_tokens(user_id: UserID, connection: &Connection) -> Result<i64, Error> {
    let rows_affected = connection.execute(
        "UPDATE refresh_token SET revoked_at = ?1 WHERE user_id = ?2 AND revoked_at IS NULL",
        (OffsetDateTime::now_utc(), user_id),
    )?;

    Ok(rows_affected as i64)
}

/// Delete tokens that expired before `cutoff`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the delete failed.
pub fn delete_expired_refresh_tokens(
    cutoff: OffsetDateTime,
    connection: &Connection,
) -> Result<i64, Error> {
    let rows_affected =
        connection.execute("DELETE FROM refresh_token WHERE expires_at < ?1", (cutoff,))?;

    Ok(rows_affected as i64)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{Email, PasswordHash, Role, User, create_user},
        db::initialize,
    };

    use super::{
        delete_expired_refresh_tokens, find_refresh_token, revoke_all_refresh_tokens,
        revoke_refresh_token, store_refresh_token,
    };

    fn get_connection_and_user() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            Email::new("foo@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn stored_token_can_be_found_by_hash() {
        let (connection, user) = get_connection_and_user();
        let expires_at = OffsetDateTime::now_utc() + Duration::days(1);

        let stored = store_refresh_token(user.id, "abc", expires_at, &connection).unwrap();
        let found = find_refresh_token("abc", &connection).unwrap();

        assert_eq!(found, Some(stored.clone()));
        assert!(stored.is_usable(OffsetDateTime::now_utc()));
        assert_eq!(find_refresh_token("def", &connection).unwrap(), None);
    }

    #[test]
    fn revoked_token_is_not_usable() {
        let (connection, user) = get_connection_and_user();
        let expires_at = OffsetDateTime::now_utc() + Duration::days(1);
        let first = store_refresh_token(user.id, "abc", expires_at, &connection).unwrap();
        let second = store_refresh_token(user.id, "def", expires_at, &connection).unwrap();

        revoke_refresh_token(first.id, Some(second.id), &connection).unwrap();

        let found = find_refresh_token("abc", &connection).unwrap().unwrap();
        assert!(!found.is_usable(OffsetDateTime::now_utc()));
        assert_eq!(found.replaced_by, Some(second.id));
    }

    #[test]
    fn expired_token_is_not_usable() {
        let (connection, user) = get_connection_and_user();
        let expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);

        let stored = store_refresh_token(user.id, "abc", expires_at, &connection).unwrap();

        assert!(!stored.is_usable(OffsetDateTime::now_utc()));
    }

    #[test]
    fn revoke_all_only_counts_live_tokens() {
        let (connection, user) = get_connection_and_user();
        let expires_at = OffsetDateTime::now_utc() + Duration::days(1);
        let first = store_refresh_token(user.id, "abc", expires_at, &connection).unwrap();
        store_refresh_token(user.id, "def", expires_at, &connection).unwrap();
        store_refresh_token(user.id, "ghi", expires_at, &connection).unwrap();
        revoke_refresh_token(first.id, None, &connection).unwrap();

        let revoked = revoke_all_refresh_tokens(user.id, &connection).unwrap();

        assert_eq!(revoked, 2);
    }

    #[test]
    fn deletes_expired_tokens() {
        let (connection, user) = get_connection_and_user();
        let now = OffsetDateTime::now_utc();
        store_refresh_token(user.id, "old", now - Duration::days(1), &connection).unwrap();
        store_refresh_token(user.id, "new", now + Duration::days(1), &connection).unwrap();

        let deleted = delete_expired_refresh_tokens(now, &connection).unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(find_refresh_token("old", &connection).unwrap(), None);
        assert!(find_refresh_token("new", &connection).unwrap().is_some());
    }
}
