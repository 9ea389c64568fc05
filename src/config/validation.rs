//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//! - Check credentials are usable by the auth handlers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("auth.basic.username must not be empty or contain ':'")]
    InvalidUsername,

    #[error("auth.oauth2.introspection_url: {0}")]
    InvalidIntrospectionUrl(String),

    #[error("observability.log_level: unknown level `{0}`")]
    InvalidLogLevel(String),
}

/// Check everything serde cannot.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.read_secs"));
    }
    if config.timeouts.write_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.write_secs"));
    }
    if config.limits.max_header_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_header_bytes"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    let level = config.observability.log_level.to_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Some(basic) = &config.auth.basic {
        if basic.username.is_empty() || basic.username.contains(':') {
            errors.push(ValidationError::InvalidUsername);
        }
    }

    if let Some(oauth2) = &config.auth.oauth2 {
        if let Some(raw) = &oauth2.introspection_url {
            match url::Url::parse(raw) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                Ok(u) => errors.push(ValidationError::InvalidIntrospectionUrl(format!(
                    "unsupported scheme `{}`",
                    u.scheme()
                ))),
                Err(e) => errors.push(ValidationError::InvalidIntrospectionUrl(e.to_string())),
            }
        }
        if oauth2.timeout_secs == 0 {
            errors.push(ValidationError::Zero("auth.oauth2.timeout_secs"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BasicAuthConfig, OAuth2Config};

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.read_secs = 0;
        config.limits.max_body_bytes = 0;
        config.observability.log_level = "loud".into();
        config.auth.basic = Some(BasicAuthConfig::new("a:b", "p"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Zero("timeouts.read_secs")));
        assert!(errors.contains(&ValidationError::InvalidUsername));
    }

    #[test]
    fn test_introspection_url() {
        let mut config = AppConfig::default();
        config.auth.oauth2 = Some(OAuth2Config {
            introspection_url: Some("ftp://idp.example/introspect".into()),
            timeout_secs: 5,
            ..Default::default()
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidIntrospectionUrl(_)));

        config.auth.oauth2 = Some(OAuth2Config {
            introspection_url: Some("https://idp.example/introspect".into()),
            timeout_secs: 5,
            ..Default::default()
        });
        assert_eq!(validate_config(&config), Ok(()));
    }
}
