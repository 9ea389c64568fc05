//! Response writers.
//!
//! # Responsibilities
//! - Stage status and headers on a live dialogue (non-terminating)
//! - Write bodies: bytes, text, JSON, files, redirects, errors (terminating)
//! - Provide the not-found fallback handler
//!
//! # Design Decisions
//! - Every writer goes through `Dialogue::terminate`, so writing twice only
//!   logs a warning and never changes what the client receives
//! - Failures while producing a body become 4xx/5xx responses, never panics

use std::io::ErrorKind;
use std::path::Path;

use axum::{
    body::Bytes,
    http::{
        header::{self, HeaderName},
        HeaderValue, Method, StatusCode,
    },
};
use serde::Serialize;

use crate::dispatch::{Dialogue, Handler, ResponseSink};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";
const NOT_FOUND: &str = "404 page not found";

/// Stage the response status. Does not terminate.
pub fn set_status(mut d: Dialogue, status: StatusCode) -> Dialogue {
    d.stage_status(status);
    d
}

/// Stage a response header. Does not terminate.
///
/// Names or values that are not valid HTTP are dropped with a warning.
pub fn set_header(mut d: Dialogue, key: &str, value: &str) -> Dialogue {
    match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => {
            d.stage_header(name, value);
        }
        _ => {
            tracing::warn!(path = %d.path(), header = %key, "Invalid response header dropped");
        }
    }
    d
}

/// Stage the `Content-Type` header. Does not terminate.
pub fn set_content_type(d: Dialogue, content_type: &str) -> Dialogue {
    set_header(d, header::CONTENT_TYPE.as_str(), content_type)
}

/// Write `content` with `status` and terminate.
pub fn write_response(
    mut d: Dialogue,
    status: StatusCode,
    content: impl Into<Bytes>,
) -> Dialogue {
    let content = content.into();
    d.terminate(|sink| {
        sink.set_status(status);
        sink.set_body(content);
    });
    d
}

/// Write a text body with `status` and terminate.
pub fn write_string(d: Dialogue, status: StatusCode, content: impl Into<String>) -> Dialogue {
    write_response(d, status, content.into())
}

/// Serialize `content` as JSON and terminate.
///
/// If serialization fails the dialogue is terminated with a 500 carrying the
/// serializer's message instead.
pub fn write_json<T: Serialize + ?Sized>(d: Dialogue, status: StatusCode, content: &T) -> Dialogue {
    match serde_json::to_vec(content) {
        Ok(body) => {
            let d = set_content_type(d, APPLICATION_JSON);
            write_response(d, status, body)
        }
        Err(e) => {
            tracing::error!(path = %d.path(), error = %e, "Failed to serialize JSON response");
            http_error(d, StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// Write `message` as the body of an error response and terminate.
pub fn write_error(d: Dialogue, status: StatusCode, message: &str) -> Dialogue {
    write_response(d, status, message.to_string())
}

/// Redirect to `url` with `status` and terminate.
///
/// GET and HEAD requests get a short HTML body (empty for HEAD) pointing at
/// the target, like browsers expect.
pub fn redirect_to(mut d: Dialogue, url: &str, status: StatusCode) -> Dialogue {
    let location = match HeaderValue::try_from(url) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(
                path = %d.path(),
                url = %url,
                "Redirect target is not a valid header value"
            );
            return http_error(d, StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect target");
        }
    };

    let method = d.request().method().clone();
    let reason = status.canonical_reason().unwrap_or("Redirect");
    let body = if method == Method::GET {
        format!("<a href=\"{}\">{}</a>.\n\n", html_escape(url), reason)
    } else {
        String::new()
    };
    let is_get_or_head = method == Method::GET || method == Method::HEAD;

    d.terminate(|sink| {
        sink.insert_header(header::LOCATION, location);
        if is_get_or_head {
            sink.insert_header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
        }
        sink.set_status(status);
        sink.set_body(body);
    });
    d
}

/// Send the file at `path` verbatim as `application/octet-stream`.
///
/// Missing files answer 404, unreadable ones 403 or 500.
pub fn serve_file(d: Dialogue, path: impl AsRef<Path>) -> Dialogue {
    let path = path.as_ref();
    let d = set_content_type(d, OCTET_STREAM);

    let result = std::fs::metadata(path).and_then(|meta| {
        if meta.is_dir() {
            Err(std::io::Error::new(ErrorKind::NotFound, "is a directory"))
        } else {
            std::fs::read(path)
        }
    });

    match result {
        Ok(content) => {
            tracing::debug!(file = %path.display(), bytes = content.len(), "Serving file");
            write_response(d, StatusCode::OK, content)
        }
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::debug!(
                file = %path.display(),
                error = %e,
                status = %status,
                "Cannot serve file"
            );
            let message = match status {
                StatusCode::NOT_FOUND => NOT_FOUND.to_string(),
                other => format!(
                    "{} {}",
                    other.as_u16(),
                    other.canonical_reason().unwrap_or_default()
                ),
            };
            http_error(d, status, &message)
        }
    }
}

/// Handler answering a plain-text 404 and terminating.
pub fn not_found_handler() -> impl Handler + Clone {
    |mut d: Dialogue| {
        if d.terminate(|sink| write_plain_error(sink, StatusCode::NOT_FOUND, NOT_FOUND)) {
            d.log("Sent 404 Not Found");
        }
        d
    }
}

/// Plain-text error body, newline terminated, sniffing disabled.
fn http_error(mut d: Dialogue, status: StatusCode, message: &str) -> Dialogue {
    d.terminate(|sink| write_plain_error(sink, status, message));
    d
}

fn write_plain_error(sink: &mut ResponseSink, status: StatusCode, message: &str) {
    sink.insert_header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    sink.insert_header(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    sink.set_status(status);
    sink.set_body(format!("{message}\n"));
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}
