//! Request intake.
//!
//! # Responsibilities
//! - Enforce the header-section size limit before the body is read
//! - Buffer the body (bounded) and build the request a dialogue owns
//! - Expose the request ID set by the request-id layer
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (tower-http layer)
//! - Header size limits enforced before full body read
//! - Bodies are buffered whole; streaming is out of scope

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use thiserror::Error;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The request ID, or `"unknown"` when the layer did not set one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Approximate wire size of a header section (`name: value\r\n` per entry).
pub fn header_bytes(headers: &HeaderMap) -> usize {
    headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.as_bytes().len() + 4)
        .sum()
}

/// Why an inbound request was refused before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("Request header fields too large")]
    HeadersTooLarge,

    #[error("Request body too large")]
    BodyTooLarge,
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::HeadersTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            IntakeError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Check limits and buffer the body into a request a dialogue can own.
pub async fn buffer_request(
    request: Request<Body>,
    max_header_bytes: usize,
    max_body_bytes: usize,
) -> Result<Request<Bytes>, IntakeError> {
    if header_bytes(request.headers()) > max_header_bytes {
        return Err(IntakeError::HeadersTooLarge);
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|_| IntakeError::BodyTooLarge)?;

    Ok(Request::from_parts(parts, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, "abc-123".parse().unwrap());
        assert_eq!(request_id(&headers), "abc-123");
    }

    #[test]
    fn test_header_bytes() {
        let mut headers = HeaderMap::new();
        headers.insert("x-a", "12345".parse().unwrap());
        assert_eq!(header_bytes(&headers), 3 + 5 + 4);
    }

    #[tokio::test]
    async fn test_buffer_request_limits() {
        let req = Request::builder()
            .uri("/upload")
            .body(Body::from("0123456789"))
            .unwrap();
        let buffered = buffer_request(req, 1024, 64).await.unwrap();
        assert_eq!(buffered.body().as_ref(), b"0123456789");
        assert_eq!(buffered.uri().path(), "/upload");

        let req = Request::builder()
            .uri("/upload")
            .body(Body::from("0123456789"))
            .unwrap();
        assert_eq!(
            buffer_request(req, 1024, 4).await.unwrap_err(),
            IntakeError::BodyTooLarge
        );

        let req = Request::builder()
            .uri("/upload")
            .header("x-big", "v".repeat(100))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            buffer_request(req, 16, 64).await.unwrap_err(),
            IntakeError::HeadersTooLarge
        );
    }

    #[test]
    fn test_intake_error_status_and_message() {
        let err = IntakeError::HeadersTooLarge;
        assert_eq!(err.status(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);
        assert_eq!(err.to_string(), "Request header fields too large");

        let err = IntakeError::BodyTooLarge;
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "Request body too large");
    }
}
