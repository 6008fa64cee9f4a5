//! Middleware for logging requests and responses.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// The maximum number of bytes of a body logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// JSON fields whose values never appear in the logs.
const SECRET_FIELDS: [&str; 6] = [
    "password",
    "current_password",
    "new_password",
    "access_token",
    "refresh_token",
    "token",
];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged at the `debug` level.
/// Passwords and tokens in JSON bodies are replaced with asterisks.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = match extract_request_parts_and_body(request).await {
        Ok(parts_and_body) => parts_and_body,
        Err(response) => return response,
    };
    log_request(&parts, &redact_body(&body_text));

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body_text) = match extract_response_parts_and_body(response).await {
        Ok(parts_and_body) => parts_and_body,
        Err(response) => return response,
    };
    log_response(&parts, &redact_body(&body_text));

    Response::from_parts(parts, body_text.into())
}

/// Replace secrets in any body that parses as JSON, whatever its content type.
fn redact_body(body_text: &str) -> String {
    match serde_json::from_str::<Value>(body_text) {
        Ok(mut value) => {
            redact_secrets(&mut value);
            value.to_string()
        }
        Err(_) => body_text.to_owned(),
    }
}

fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) && field.is_string() {
                    *field = Value::String("********".to_owned());
                } else {
                    redact_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

async fn extract_request_parts_and_body(
    request: Request,
) -> Result<(axum::http::request::Parts, String), Response> {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| {
            tracing::warn!("Could not read request body: {error}");
            StatusCode::BAD_REQUEST.into_response()
        })?;

    Ok((parts, String::from_utf8_lossy(&body_bytes).to_string()))
}

async fn extract_response_parts_and_body(
    response: Response,
) -> Result<(axum::http::response::Parts, String), Response> {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| {
            tracing::error!("Could not read response body: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })?;

    Ok((parts, String::from_utf8_lossy(&body_bytes).to_string()))
}

fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {}...",
            parts.method,
            parts.uri,
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            parts.method,
            parts.uri
        );
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {}...",
            parts.status,
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", parts.status);
    }
}

#[cfg(test)]
mod tests {
    use axum::middleware;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        routing::build_router,
        test_utils::{get_test_server, register_user},
    };

    use super::{LOG_BODY_LENGTH_LIMIT, logging_middleware, redact_body, truncate};

    #[test]
    fn redacts_passwords_and_tokens() {
        let body = json!({
            "email": "foo@bar.baz",
            "current_password": "hunter2",
            "new_password": "hunter3",
            "session": { "access_token": "abc", "refresh_token": "def" },
        })
        .to_string();

        let redacted: Value = serde_json::from_str(&redact_body(&body)).unwrap();

        assert_eq!(redacted["email"], "foo@bar.baz");
        assert_eq!(redacted["current_password"], "********");
        assert_eq!(redacted["new_password"], "********");
        assert_eq!(redacted["session"]["access_token"], "********");
        assert_eq!(redacted["session"]["refresh_token"], "********");
    }

    #[test]
    fn redacts_json_without_content_type() {
        let body = r#"{"refresh_token":"hunter2"}"#;

        let redacted = redact_body(body);

        assert!(!redacted.contains("hunter2"), "got {redacted}");
        assert!(redacted.contains("********"));
    }

    #[test]
    fn leaves_non_json_bodies_alone() {
        let body = "password=hunter2";

        assert_eq!(redact_body(body), body);
    }

    #[tokio::test]
    async fn refresh_with_unlabelled_body_passes_through_logging() {
        let (server, context) = get_test_server();
        let session = register_user(&server, "foo@bar.baz").await;
        let logged_server = TestServer::try_new(
            build_router(context.state.clone()).layer(middleware::from_fn(logging_middleware)),
        )
        .expect("Could not create test server.");
        let body = json!({ "refresh_token": session.refresh_token }).to_string();

        let response = logged_server
            .post(endpoints::REFRESH)
            .bytes(body.clone().into())
            .await;

        response.assert_status_ok();
        assert!(!redact_body(&body).contains(&session.refresh_token));
    }

    #[test]
    fn truncates_on_char_boundary() {
        let body = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&body);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(truncated));
    }
}
