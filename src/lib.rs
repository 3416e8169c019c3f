//! slircbot - Straylight IRC Bot
//!
//! An IRC client session engine: a reconnecting connection with a
//! flow-controlled sender, a tracked view of channels and nicknames,
//! hot-reloadable plugin modules and named timers.

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod plugins;
pub mod state;
pub mod timers;

pub use config::Config;
pub use engine::{CommandSink, Engine};
pub use network::ConnectionManager;
