//! Integration test common infrastructure.
//!
//! Provides a scripted fake IRC server and helpers for building bot
//! configurations that point at it.

pub mod server;

#[allow(unused_imports)]
pub use server::{FakeServer, ServerPeer};

use slircbot::Config;

/// Configuration for a bot named `bot` connecting to `server`.
#[allow(dead_code)]
pub fn config_for(server: &FakeServer) -> Config {
    Config::new("127.0.0.1", server.port(), "bot")
}
