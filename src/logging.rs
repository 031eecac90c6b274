//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, header::{CONTENT_LENGTH, CONTENT_TYPE}, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Request and response bodies longer than this many bytes are truncated in
/// the `info` log.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated
/// and the full body is logged at the `debug` level.
///
/// Multipart bodies are passed through untouched and only their size is
/// logged, so uploaded files are neither buffered here nor written to the log.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if is_multipart(&request) {
        let (parts, body) = request.into_parts();
        let size = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|length| length.to_str().ok())
            .unwrap_or("unknown");
        log_request(&parts, &format!("<multipart body of {size} bytes>"));
        Request::from_parts(parts, body)
    } else {
        let (parts, body_text) = match extract_request_parts_and_body_text(request).await {
            Ok(parts_and_body) => parts_and_body,
            Err(response) => return response,
        };
        log_request(&parts, &body_text);
        Request::from_parts(parts, Body::from(body_text))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body_bytes) => {
            log_response(&parts, &String::from_utf8_lossy(&body_bytes));
            Response::from_parts(parts, Body::from(body_bytes))
        }
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("multipart/form-data"))
}

async fn extract_request_parts_and_body_text(
    request: Request,
) -> Result<(request::Parts, String), Response> {
    let (parts, body) = request.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body_bytes) => Ok((parts, String::from_utf8_lossy(&body_bytes).to_string())),
        Err(error) => {
            tracing::debug!("Could not read request body: {error}");
            Err(StatusCode::BAD_REQUEST.into_response())
        }
    }
}

/// Cut `body` to at most [LOG_BODY_LENGTH_LIMIT] bytes on a char boundary.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
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

fn log_response(parts: &response::Parts, body: &str) {
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
