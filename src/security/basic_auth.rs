//! HTTP Basic authentication handler.
//!
//! Chain it in front of the handlers it protects. On success the dialogue
//! passes through untouched (plus a trail entry); on failure it is
//! terminated with 401, which stops the rest of the chain.

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::BasicAuthConfig;
use crate::dispatch::{Dialogue, Handler};
use crate::http::response::{set_header, write_string};

/// Checks `Authorization: Basic ...` against one configured credential pair.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    config: BasicAuthConfig,
    challenge: String,
}

impl BasicAuth {
    pub fn new(config: BasicAuthConfig) -> Self {
        let challenge = format!("Basic realm=\"{}\"", config.realm);
        Self { config, challenge }
    }

    fn credentials_match(&self, payload: &str) -> bool {
        let decoded = match STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let decoded = match String::from_utf8(decoded) {
            Ok(s) => s,
            Err(_) => return false,
        };
        match decoded.split_once(':') {
            Some((user, pass)) => user == self.config.username && pass == self.config.password,
            None => false,
        }
    }
}

/// Build a Basic authentication handler.
pub fn basic_auth(config: BasicAuthConfig) -> BasicAuth {
    BasicAuth::new(config)
}

impl Handler for BasicAuth {
    fn handle(&self, d: Dialogue) -> Dialogue {
        let scheme_and_payload = d
            .header(header::AUTHORIZATION.as_str())
            .and_then(|h| h.split_once(' '));
        let payload = match scheme_and_payload {
            Some(("Basic", payload)) => payload.to_string(),
            _ => {
                tracing::debug!(path = %d.path(), "Missing or malformed Basic credentials");
                let d = set_header(d, header::WWW_AUTHENTICATE.as_str(), &self.challenge);
                return write_string(d, StatusCode::UNAUTHORIZED, "Unauthorized");
            }
        };

        if !self.credentials_match(&payload) {
            tracing::warn!(path = %d.path(), "Basic authentication failed");
            return write_string(d, StatusCode::UNAUTHORIZED, "Unauthorized");
        }

        let mut d = d;
        d.log(format!("Authenticated {}", self.config.username));
        d
    }
}
