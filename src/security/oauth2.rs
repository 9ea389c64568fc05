//! OAuth2 bearer token handler.
//!
//! Wraps a protected handler: the bearer token from `Authorization` is
//! checked by a [`TokenVerifier`] and only a verified dialogue is mapped
//! into the wrapped handler. Every failure is a 401.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::OAuth2Config;
use crate::dispatch::{BoxHandler, Dialogue, Handler};
use crate::http::response::write_string;

/// Why a bearer token was refused.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("empty token")]
    Empty,

    #[error("token is not active")]
    Inactive,

    #[error("token introspection failed: {0}")]
    Introspection(#[from] reqwest::Error),
}

/// Decides whether an access token is acceptable.
///
/// Implementations may block; handlers run on a blocking-capable thread.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<(), TokenError>;
}

/// Accepts any non-empty token without contacting an authorization server.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyToken;

impl TokenVerifier for AcceptAnyToken {
    fn verify(&self, token: &str) -> Result<(), TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(())
    }
}

/// Accepts exactly the tokens it was given.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashSet<String>,
}

impl StaticTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

impl TokenVerifier for StaticTokens {
    fn verify(&self, token: &str) -> Result<(), TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(TokenError::Inactive)
        }
    }
}

/// RFC 7662 token introspection against an authorization server.
#[derive(Debug, Clone)]
pub struct Introspection {
    url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
}

impl Introspection {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TokenVerifier for Introspection {
    fn verify(&self, token: &str) -> Result<(), TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        // Built per call: a blocking client must not be created or dropped
        // on an async worker thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response: IntrospectionResponse = client
            .post(&self.url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()?
            .error_for_status()?
            .json()?;

        if response.active {
            Ok(())
        } else {
            Err(TokenError::Inactive)
        }
    }
}

/// Bearer-token gate in front of `next`.
#[derive(Clone)]
pub struct OAuth2 {
    verifier: Arc<dyn TokenVerifier>,
    next: BoxHandler,
}

impl OAuth2 {
    /// Verifier chosen from config: introspection when a URL is set,
    /// otherwise any non-empty token is accepted.
    pub fn new(config: &OAuth2Config, next: impl Handler + 'static) -> Self {
        match &config.introspection_url {
            Some(url) => Self::with_verifier(
                Introspection::new(url, &config.client_id, &config.client_secret)
                    .timeout(Duration::from_secs(config.timeout_secs)),
                next,
            ),
            None => Self::with_verifier(AcceptAnyToken, next),
        }
    }

    pub fn with_verifier(
        verifier: impl TokenVerifier + 'static,
        next: impl Handler + 'static,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            next: BoxHandler::new(next),
        }
    }
}

/// Build an OAuth2 handler protecting `next`.
pub fn oauth2(config: &OAuth2Config, next: impl Handler + 'static) -> OAuth2 {
    OAuth2::new(config, next)
}

/// Split `Authorization` into `(type, credentials)`.
fn parse_auth_header(value: &str) -> Option<(&str, &str)> {
    value.split_once(' ')
}

fn unauthorized(d: Dialogue) -> Dialogue {
    write_string(d, StatusCode::UNAUTHORIZED, "Unauthorized")
}

impl Handler for OAuth2 {
    fn handle(&self, d: Dialogue) -> Dialogue {
        let token = match d.header(header::AUTHORIZATION.as_str()) {
            None | Some("") => return unauthorized(d),
            Some(value) => match parse_auth_header(value) {
                Some(("Bearer", token)) => token.to_string(),
                _ => {
                    tracing::debug!(path = %d.path(), "Malformed Authorization header");
                    return unauthorized(d);
                }
            },
        };

        if let Err(e) = self.verifier.verify(&token) {
            tracing::warn!(path = %d.path(), error = %e, "Bearer token rejected");
            return unauthorized(d);
        }

        d.map(&self.next)
    }
}
