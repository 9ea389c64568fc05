//! The per-request dispatch context.
//!
//! # Lifecycle
//! ```text
//! Fresh ──map(handler)──▶ Active ──terminate()──▶ Terminated
//! ```
//! There is no way back from `Terminated`. Once terminated, the response
//! sink and the path params are frozen; a second termination attempt only
//! appends a warning to the log trail.

use axum::{
    body::{Body, Bytes},
    http::{header::HeaderName, HeaderMap, HeaderValue, Request, StatusCode},
    response::Response,
};

use crate::routing::{PathParams, TypedValue};

/// Where a dialogue is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no handler has run yet.
    Fresh,
    /// At least one handler has run, no response yet.
    Active,
    /// A response has been written.
    Terminated,
}

/// Outbound response being assembled for one request.
///
/// Status and headers may be staged while the dialogue is live; the body is
/// written exactly once, by the termination that freezes the sink.
#[derive(Debug, Clone)]
pub struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl ResponseSink {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Convert into the wire response handed back to the transport.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// State threaded through every handler for a single request.
#[derive(Debug)]
pub struct Dialogue {
    request: Request<Bytes>,
    response: ResponseSink,
    logs: Vec<String>,
    phase: Phase,
    path_params: Option<PathParams>,
}

impl Dialogue {
    /// Create a fresh dialogue owning `request`.
    pub fn new(request: Request<Bytes>) -> Self {
        Self {
            request,
            response: ResponseSink::default(),
            logs: Vec::new(),
            phase: Phase::Fresh,
            path_params: None,
        }
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Request path, without the query string.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// A request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    pub fn response(&self) -> &ResponseSink {
        &self.response
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Params bound by the route that matched, if any did.
    pub fn path_params(&self) -> Option<&PathParams> {
        self.path_params.as_ref()
    }

    pub fn param(&self, name: &str) -> Option<&TypedValue> {
        self.path_params.as_ref().and_then(|p| p.get(name))
    }

    /// Append an entry to the log trail.
    pub fn log(&mut self, entry: impl Into<String>) {
        self.logs.push(entry.into());
    }

    /// Append a warning to the log trail and emit it as a tracing event.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %self.path(), "{}", message);
        self.logs.push(format!("Warning: {message}"));
    }

    pub(crate) fn activate(&mut self) {
        if self.phase == Phase::Fresh {
            self.phase = Phase::Active;
        }
    }

    /// Record route params. Only the first successful match binds them.
    pub(crate) fn bind_params(&mut self, params: PathParams) -> bool {
        if self.is_terminated() || self.path_params.is_some() {
            tracing::debug!(
                path = %self.path(),
                "Path params already bound, keeping the first match"
            );
            return false;
        }
        self.path_params = Some(params);
        true
    }

    /// Stage the status code without terminating.
    pub fn stage_status(&mut self, status: StatusCode) -> bool {
        if self.is_terminated() {
            tracing::warn!(
                path = %self.path(),
                status = %status,
                "Status ignored, response already written"
            );
            return false;
        }
        self.response.set_status(status);
        true
    }

    /// Stage a header without terminating.
    pub fn stage_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.is_terminated() {
            tracing::warn!(
                path = %self.path(),
                header = %name,
                "Header ignored, response already written"
            );
            return false;
        }
        self.response.insert_header(name, value);
        true
    }

    /// Write the response through `write` and move to `Terminated`.
    ///
    /// Returns `false`, leaving the sink untouched, if the dialogue was
    /// already terminated.
    pub fn terminate(&mut self, write: impl FnOnce(&mut ResponseSink)) -> bool {
        if self.is_terminated() {
            let message = format!("request {} was processed before", self.path());
            self.warn(message);
            return false;
        }
        write(&mut self.response);
        self.phase = Phase::Terminated;
        true
    }

    /// Terminate with the staged status and headers and an empty body.
    pub fn finish(mut self) -> Self {
        self.terminate(|sink| sink.set_body(Bytes::new()));
        self
    }

    /// Hand the sink and trail over to the transport.
    pub fn into_parts(self) -> (ResponseSink, Vec<String>) {
        (self.response, self.logs)
    }
}
