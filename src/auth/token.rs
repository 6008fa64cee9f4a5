//! Defines the JSON web tokens used for access and refresh tokens, and helpers for
//! opaque one-time codes.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Role, UserID},
};

/// Distinguishes access tokens from refresh tokens so one cannot stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// A short-lived token sent with every request.
    Access,
    /// A long-lived token only accepted by the refresh endpoint.
    Refresh,
}

/// The contents of a JSON Web Token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: UserID,
    /// The role of the user when the token was issued.
    pub role: Role,
    /// The time the token was issued, in seconds since the Unix epoch.
    pub iat: i64,
    /// The expiry time of the token, in seconds since the Unix epoch.
    pub exp: i64,
    /// A random ID that makes every token unique.
    pub jti: String,
    /// Whether this is an access or a refresh token.
    pub typ: TokenKind,
}

/// The keys for signing and verifying tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenKeys {
    /// Derive the HMAC signing key from the server secret.
    pub fn from_secret(secret: &str) -> Self {
        let key = Sha256::digest(format!("token-signing:{secret}"));

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
        }
    }
}

/// A signed token and when it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedToken {
    /// The encoded JWT.
    pub token: String,
    /// When the token expires.
    pub expires_at: OffsetDateTime,
}

/// Create a signed token of `kind` for the user that is valid for `duration`.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be encoded.
pub fn encode_token(
    user_id: UserID,
    role: Role,
    kind: TokenKind,
    duration: Duration,
    keys: &TokenKeys,
) -> Result<SignedToken, Error> {
    let now = OffsetDateTime::now_utc();
    let expires_at = now + duration;
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.unix_timestamp(),
        exp: expires_at.unix_timestamp(),
        jti: generate_code(),
        typ: kind,
    };

    let token = encode_claims(&claims, keys)?;

    Ok(SignedToken { token, expires_at })
}

fn encode_claims(claims: &Claims, keys: &TokenKeys) -> Result<String, Error> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Decode and validate a token, checking its signature, expiry and kind.
///
/// # Errors
///
/// Returns:
/// - [Error::Unauthorized] for an invalid access token,
/// - [Error::InvalidRefreshToken] for an invalid refresh token.
pub fn decode_token(token: &str, kind: TokenKind, keys: &TokenKeys) -> Result<Claims, Error> {
    let invalid = || match kind {
        TokenKind::Access => Error::Unauthorized,
        TokenKind::Refresh => Error::InvalidRefreshToken,
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &keys.decoding_key, &validation)
        .map_err(|error| {
            tracing::debug!("Rejected {kind:?} token: {error}");
            invalid()
        })?
        .claims;

    if claims.typ != kind {
        tracing::debug!("Rejected token of kind {:?}, wanted {kind:?}", claims.typ);
        return Err(invalid());
    }

    Ok(claims)
}

/// Generate 32 random bytes, hex encoded.
pub fn generate_code() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);

    hex::encode(bytes)
}

/// Hash a token for storage. Only the hash of refresh tokens and one-time codes is stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
