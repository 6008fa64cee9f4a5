//! Defines the app level error type and its conversion into JSON error responses.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::OffsetDateTime;

use crate::database_id::AccountId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an unknown email address or the wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not carry a valid access token.
    #[error("missing or invalid access token")]
    Unauthorized,

    /// The refresh token is malformed, expired, revoked or unknown.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// A JSON web token could not be created.
    ///
    /// The error string should only be logged on the server.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// An email verification or password reset token is unknown, expired,
    /// already used, or was issued for a different purpose.
    #[error("the token is invalid or has expired")]
    InvalidOneTimeToken,

    /// The user asked to verify an email address that is already verified.
    #[error("the email address has already been verified")]
    EmailAlreadyVerified,

    /// The string is not a valid email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address is already registered.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The authenticated user does not own the requested resource.
    #[error("you do not have access to this resource")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The request was well-formed JSON but violates a business rule.
    #[error("{0}")]
    Validation(String),

    /// A timestamp in the future was used for a transaction or trade.
    ///
    /// Ledger entries record events that have already happened.
    #[error("{0} is in the future, which is not allowed")]
    FutureDate(OffsetDateTime),

    /// The currency code is not three ASCII letters.
    #[error("\"{0}\" is not a valid currency code")]
    InvalidCurrency(String),

    /// The user already has an account with this name.
    #[error("the account \"{0}\" already exists")]
    DuplicateAccountName(String),

    /// Tried to delete an account that still holds money without cascading.
    #[error("the account has a non-zero balance of {0}, delete with cascade to force")]
    NonZeroBalance(f64),

    /// Tried to delete an account that still has ledger entries without cascading.
    #[error("the account has transactions or trades, delete with cascade to force")]
    AccountHasEntries,

    /// Tried to book a transaction or trade against an inactive account.
    #[error("the account {0} is inactive")]
    AccountInactive(AccountId),

    /// Tried to transfer between accounts with different currencies.
    #[error("cannot transfer between accounts in {0} and {1}")]
    CurrencyMismatch(String, String),

    /// The client sent too many requests.
    #[error("too many requests, try again later")]
    RateLimited,

    /// A message could not be handed to the mailer.
    #[error("could not send email: {0}")]
    MailError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::Unauthorized | Error::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidOneTimeToken
            | Error::InvalidEmail(_)
            | Error::TooWeak(_)
            | Error::Validation(_)
            | Error::FutureDate(_)
            | Error::InvalidCurrency(_)
            | Error::CurrencyMismatch(_, _) => StatusCode::BAD_REQUEST,
            Error::EmailAlreadyVerified
            | Error::DuplicateEmail
            | Error::DuplicateAccountName(_)
            | Error::NonZeroBalance(_)
            | Error::AccountHasEntries
            | Error::AccountInactive(_) => StatusCode::CONFLICT,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::TokenCreation(_)
            | Error::HashingError(_)
            | Error::MailError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server side errors are not intended to be shown to the client.
        let message = if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// A JSON extractor that reports malformed bodies with the app's error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct AppJson<T>(pub T);

/// A path parameter extractor that reports unparsable IDs with the app's error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct AppPath<T>(pub T);

/// A query string extractor that reports bad parameters with the app's error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn no_rows_becomes_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
            (Error::Forbidden, StatusCode::FORBIDDEN),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::TooWeak("short".to_owned()), StatusCode::BAD_REQUEST),
            (Error::NonZeroBalance(12.5), StatusCode::CONFLICT),
            (Error::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), want);
        }
    }

    #[tokio::test]
    async fn hides_internal_error_details() {
        let response = Error::HashingError("bcrypt exploded".to_owned()).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&body);

        assert!(!body.contains("bcrypt exploded"), "got body {body}");
        assert!(body.contains("\"error\""));
    }
}
