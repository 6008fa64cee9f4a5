//! Single-use codes for email verification and password resets.

use rusqlite::{
    Connection, OptionalExtension, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{
        UserID,
        token::{generate_code, hash_token},
    },
};

/// How long an email verification code is valid for.
pub const EMAIL_VERIFICATION_DURATION: Duration = Duration::hours(24);
/// How long a password reset code is valid for.
pub const PASSWORD_RESET_DURATION: Duration = Duration::hours(1);

/// What a one-time code may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Proves the user owns their email address.
    EmailVerification,
    /// Lets the user set a new password without knowing the old one.
    PasswordReset,
}

impl TokenPurpose {
    fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "EMAIL_VERIFICATION",
            TokenPurpose::PasswordReset => "PASSWORD_RESET",
        }
    }

    /// How long a code for this purpose is valid for.
    pub fn duration(&self) -> Duration {
        match self {
            TokenPurpose::EmailVerification => EMAIL_VERIFICATION_DURATION,
            TokenPurpose::PasswordReset => PASSWORD_RESET_DURATION,
        }
    }
}

impl ToSql for TokenPurpose {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TokenPurpose {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "EMAIL_VERIFICATION" => Ok(TokenPurpose::EmailVerification),
            "PASSWORD_RESET" => Ok(TokenPurpose::PasswordReset),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Create the table for one-time codes.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_token (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            purpose TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            used_at TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Issue a new code for `purpose`, returning the raw code to send to the user.
///
/// Unused codes the user holds for the same purpose are invalidated, so only
/// the most recently mailed code works.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the code could not be stored.
pub fn issue_user_token(
    user_id: UserID,
    purpose: TokenPurpose,
    connection: &Connection,
) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let code = generate_code();

    connection.execute(
        "UPDATE user_token SET used_at = ?1
         WHERE user_id = ?2 AND purpose = ?3 AND used_at IS NULL",
        (now, user_id, purpose),
    )?;
    connection.execute(
        "INSERT INTO user_token (user_id, purpose, token_hash, expires_at) VALUES (?1, ?2, ?3, ?4)",
        (user_id, purpose, hash_token(&code), now + purpose.duration()),
    )?;

    Ok(code)
}

/// Redeem a code, returning the user it was issued to.
///
/// # Errors
///
/// Returns [Error::InvalidOneTimeToken] if the code is unknown, was issued for
/// another purpose, has expired, or has already been used.
pub fn consume_user_token(
    code: &str,
    purpose: TokenPurpose,
    connection: &Connection,
) -> Result<UserID, Error> {
    let now = OffsetDateTime::now_utc();

    let row: Option<(i64, UserID, TokenPurpose, OffsetDateTime, Option<OffsetDateTime>)> =
        connection
            .query_row(
                "SELECT id, user_id, purpose, expires_at, used_at FROM user_token
                 WHERE token_hash = ?1",
                (hash_token(code),),
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

    let Some((id, user_id, stored_purpose, expires_at, used_at)) = row else {
        return Err(Error::InvalidOneTimeToken);
    };

    if stored_purpose != purpose || used_at.is_some() || expires_at <= now {
        return Err(Error::InvalidOneTimeToken);
    }

    connection.execute("UPDATE user_token SET used_at = ?1 WHERE id = ?2", (now, id))?;

    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{Email, PasswordHash, Role, User, create_user, token::hash_token},
        db::initialize,
    };

    use super::{TokenPurpose, consume_user_token, issue_user_token};

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
    fn code_can_be_used_once() {
        let (connection, user) = get_connection_and_user();
        let code =
            issue_user_token(user.id, TokenPurpose::EmailVerification, &connection).unwrap();

        let got = consume_user_token(&code, TokenPurpose::EmailVerification, &connection);
        let second = consume_user_token(&code, TokenPurpose::EmailVerification, &connection);

        assert_eq!(got, Ok(user.id));
        assert_eq!(second, Err(Error::InvalidOneTimeToken));
    }

    #[test]
    fn code_is_bound_to_purpose() {
        let (connection, user) = get_connection_and_user();
        let code = issue_user_token(user.id, TokenPurpose::PasswordReset, &connection).unwrap();

        let got = consume_user_token(&code, TokenPurpose::EmailVerification, &connection);

        assert_eq!(got, Err(Error::InvalidOneTimeToken));
    }

    #[test]
    fn new_code_invalidates_older_codes() {
        let (connection, user) = get_connection_and_user();
        let old = issue_user_token(user.id, TokenPurpose::PasswordReset, &connection).unwrap();
        let new = issue_user_token(user.id, TokenPurpose::PasswordReset, &connection).unwrap();

        assert_eq!(
            consume_user_token(&old, TokenPurpose::PasswordReset, &connection),
            Err(Error::InvalidOneTimeToken)
        );
        assert_eq!(
            consume_user_token(&new, TokenPurpose::PasswordReset, &connection),
            Ok(user.id)
        );
    }

    #[test]
    fn expired_code_is_rejected() {
        let (connection, user) = get_connection_and_user();
        let code = issue_user_token(user.id, TokenPurpose::PasswordReset, &connection).unwrap();
        connection
            .execute(
                "UPDATE user_token SET expires_at = ?1 WHERE token_hash = ?2",
                (
                    OffsetDateTime::now_utc() - Duration::minutes(1),
                    hash_token(&code),
                ),
            )
            .unwrap();

        let got = consume_user_token(&code, TokenPurpose::PasswordReset, &connection);

        assert_eq!(got, Err(Error::InvalidOneTimeToken));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let (connection, _) = get_connection_and_user();

        let got = consume_user_token("nope", TokenPurpose::PasswordReset, &connection);

        assert_eq!(got, Err(Error::InvalidOneTimeToken));
    }
}
