//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: one fallback route feeding the dispatch core
//! - Wire up middleware (request ID, tracing, timeout)
//! - Turn each request into a `Dialogue` and run the root handler
//! - Flush the terminated dialogue's response
//! - Graceful shutdown on trigger or OS signal

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, LimitsConfig};
use crate::dispatch::{BoxHandler, Dialogue, Handler};
use crate::http::request::{buffer_request, request_id};
use crate::lifecycle::{shutdown::wait_for, signals::shutdown_signal};
use crate::observability::metrics;

/// Error type for serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State injected into the dispatch endpoint.
#[derive(Clone)]
struct AppState {
    handler: BoxHandler,
    limits: Arc<LimitsConfig>,
}

/// HTTP host for a dialogue handler.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server that runs `handler` for every request.
    pub fn new(config: AppConfig, handler: impl Handler + 'static) -> Self {
        let state = AppState {
            handler: BoxHandler::new(handler),
            limits: Arc::new(config.limits.clone()),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs(),
                    )))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, for serving elsewhere or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bind the configured listener address.
    pub async fn bind(&self) -> Result<TcpListener, ServeError> {
        let address = self.config.listener.bind_address.clone();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServeError::Bind { address, source })
    }

    /// Serve on `listener` until `shutdown` fires or SIGINT/SIGTERM arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = wait_for(shutdown) => {},
                    _ = shutdown_signal() => {},
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Dispatch endpoint: one dialogue per request.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();

    let request = match buffer_request(
        request,
        state.limits.max_header_bytes,
        state.limits.max_body_bytes,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                "Request refused before dispatch"
            );
            metrics::record_request(method.as_str(), e.status().as_u16(), start);
            return (e.status(), e.to_string()).into_response();
        }
    };

    let handler = state.handler.clone();
    let dialogue = Dialogue::new(request);
    let joined = tokio::task::spawn_blocking(move || {
        let d = dialogue.map(&handler);
        if d.is_terminated() {
            d
        } else {
            tracing::warn!(path = %d.path(), "Handler chain ended without a response");
            d.finish()
        }
    })
    .await;

    let dialogue = match joined {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Handler panicked");
            metrics::record_request(method.as_str(), 500, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                .into_response();
        }
    };

    let path = dialogue.path().to_string();
    let (sink, trail) = dialogue.into_parts();
    let status = sink.status();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        trail = ?trail,
        "Dialogue finished"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    sink.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    use crate::http::response::{set_status, write_string};

    async fn call(
        server: &HttpServer,
        request: Request<Body>,
    ) -> (StatusCode, String, Option<String>) {
        let response = server.router().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), request_id)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatches_to_handler() {
        let server = HttpServer::new(AppConfig::default(), |d: Dialogue| {
            let path = d.path().to_string();
            write_string(d, StatusCode::OK, path)
        });
        let (status, body, request_id) = call(&server, get("/hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/hello");
        assert!(request_id.is_some());
    }

    #[tokio::test]
    async fn test_unterminated_chain_is_finished() {
        let server = HttpServer::new(AppConfig::default(), |d: Dialogue| {
            set_status(d, StatusCode::ACCEPTED)
        });
        let (status, body, _) = call(&server, get("/")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_body_is_buffered_for_handlers() {
        let server = HttpServer::new(AppConfig::default(), |d: Dialogue| {
            let echoed = d.request().body().clone();
            crate::http::response::write_response(d, StatusCode::OK, echoed)
        });
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from("payload"))
            .unwrap();
        let (status, body, _) = call(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "payload");
    }

    #[tokio::test]
    async fn test_oversized_body_refused() {
        let mut config = AppConfig::default();
        config.limits.max_body_bytes = 4;
        let server = HttpServer::new(config, |d: Dialogue| {
            write_string(d, StatusCode::OK, "ran")
        });
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("too large"))
            .unwrap();
        let (status, body, _) = call(&server, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, "Request body too large");
    }

    #[tokio::test]
    async fn test_panicking_handler_is_500() {
        let server = HttpServer::new(AppConfig::default(), |_d: Dialogue| -> Dialogue {
            panic!("handler bug")
        });
        let (status, _, _) = call(&server, get("/")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_bind_configured_address() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        let server = HttpServer::new(config, |d: Dialogue| d);
        let listener = server.bind().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        let server = HttpServer::new(config, |d: Dialogue| d);
        let err = server.bind().await.unwrap_err();
        assert!(matches!(err, ServeError::Bind { ref address, .. } if address == "not-an-address"));
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let server = HttpServer::new(AppConfig::default(), |d: Dialogue| {
            write_string(d, StatusCode::OK, "ok")
        });
        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "given-id")
            .body(Body::empty())
            .unwrap();
        let (_, _, request_id) = call(&server, request).await;
        assert_eq!(request_id.as_deref(), Some("given-id"));
    }
}
