//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Credentials for the authentication handlers.
    pub auth: AuthConfig,

    /// Static file serving.
    pub files: FilesConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration, enforced by the transport around the dispatch core.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to receive the request, in seconds.
    pub read_secs: u64,

    /// Time allowed to produce the response, in seconds.
    pub write_secs: u64,
}

impl TimeoutConfig {
    /// Total time budget for one request.
    pub fn request_secs(&self) -> u64 {
        self.read_secs.saturating_add(self.write_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of the header section in bytes.
    pub max_header_bytes: usize,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 1 << 20, // 1MB
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Authentication handler settings. Absent sections disable the handler.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub basic: Option<BasicAuthConfig>,
    pub oauth2: Option<OAuth2Config>,
}

/// Credentials accepted by the Basic authentication handler.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,

    /// Realm advertised in `WWW-Authenticate`.
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl BasicAuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            realm: default_realm(),
        }
    }
}

fn default_realm() -> String {
    "Restricted".to_string()
}

/// OAuth2 client settings used to verify bearer tokens.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,

    /// RFC 7662 token introspection endpoint. Without one, any non-empty
    /// bearer token is accepted.
    pub introspection_url: Option<String>,

    /// Introspection request timeout in seconds.
    #[serde(default = "default_introspection_timeout")]
    pub timeout_secs: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            introspection_url: None,
            timeout_secs: default_introspection_timeout(),
        }
    }
}

fn default_introspection_timeout() -> u64 {
    5
}

/// Static file serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory served under `/files/<name>`.
    pub root: Option<PathBuf>,
}
