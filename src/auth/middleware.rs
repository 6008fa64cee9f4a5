//! Authentication middleware that validates bearer access tokens.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    Error,
    auth::token::{TokenKeys, TokenKind, decode_token},
};

/// Middleware function that checks for a valid access token in the `Authorization` header.
///
/// The user ID is placed into the request and the request executed normally if
/// the token is valid, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(keys): State<TokenKeys>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let bearer =
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &keys).await {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(rejection) => {
                tracing::debug!("Rejected request without bearer token: {rejection}");
                return Error::Unauthorized.into_response();
            }
        };

    let claims = match decode_token(bearer.token(), TokenKind::Access, &keys) {
        Ok(claims) => claims,
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(claims.sub);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}
