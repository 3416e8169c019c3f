//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, ServerConfig, IdentityConfig, ...)
//! - [`validation`]: Startup checks that report every problem at once

mod types;
pub mod validation;

pub use types::{
    CodecConfig, Config, ConfigError, FloodConfig, IdentityConfig, LogFormat, LoggingConfig,
    PluginsConfig, ReconnectConfig, ServerConfig,
};
