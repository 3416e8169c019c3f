//! Plugin Runtime.
//!
//! - [`kind`]: event kinds and the reserved synthetic command names
//! - [`context`]: the facade handlers and timers use to act on the world
//! - [`handlers`]: per-unit handler tables
//! - [`module`]: the [`Plugin`] trait, modules and the versioned registry
//! - [`runtime`]: load/unload/reload and dispatch
//! - [`builtin`]: modules shipped with the bot

pub mod builtin;
pub mod context;
pub mod handlers;
pub mod kind;
pub mod module;
pub mod runtime;

pub use builtin::{AUTOJOIN, AutoJoin, register_builtins};
pub use context::{Action, Commands, Context};
pub use handlers::{Handler, Handlers};
pub use kind::{DISCONNECT, EventKind, LOAD, RAW, SIGNAL, UNLOAD};
pub use module::{ModuleRegistry, Plugin, PluginModule};
pub use runtime::{LoadReport, PluginRuntime, UnloadReport};
