//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use slirc_proto::{encode_line, LineCodec};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must not be 0")]
    InvalidPort,
    #[error("identity.{0} is required")]
    MissingIdentity(&'static str),
    #[error("identity.{0} must not contain spaces")]
    SpaceInIdentity(&'static str),
    #[error("flood.sentinel must be a single non-empty token, got '{0}'")]
    InvalidSentinel(String),
    #[error("flood.ceiling ({ceiling}) must fit the sentinel line ({needed} bytes)")]
    CeilingTooSmall { ceiling: usize, needed: usize },
    #[error("reconnect.base must be at least 1")]
    InvalidBackoffBase,
    #[error("codec.fallback_encoding is not a known encoding: {0}")]
    UnknownEncoding(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let identity = &config.identity;
    for (field, value) in [("username", &identity.username), ("nick", &identity.nick)] {
        if value.is_empty() {
            errors.push(ValidationError::MissingIdentity(field));
        } else if value.contains(' ') {
            errors.push(ValidationError::SpaceInIdentity(field));
        }
    }
    if identity.nick_suffix.contains(' ') {
        errors.push(ValidationError::SpaceInIdentity("nick_suffix"));
    }

    let sentinel = &config.flood.sentinel;
    if sentinel.is_empty() || sentinel.contains(char::is_whitespace) {
        errors.push(ValidationError::InvalidSentinel(sentinel.clone()));
    } else {
        let needed = encode_line(sentinel).len();
        if config.flood.ceiling < needed {
            errors.push(ValidationError::CeilingTooSmall {
                ceiling: config.flood.ceiling,
                needed,
            });
        }
    }

    if config.reconnect.base == 0 {
        errors.push(ValidationError::InvalidBackoffBase);
    }

    if LineCodec::with_fallback(&config.codec.fallback_encoding).is_err() {
        errors.push(ValidationError::UnknownEncoding(
            config.codec.fallback_encoding.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
