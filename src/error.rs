//! Unified error handling for slircbot.
//!
//! Errors are contained at the smallest enclosing boundary: a bad line, a
//! failing handler or timer callback, or a failed module operation is logged
//! and reported, never unwound across components. These types carry the
//! reported failures.

use thiserror::Error;

// ============================================================================
// Connection Errors
// ============================================================================

/// Failure of a single connect attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not connect to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("codec setup failed: {0}")]
    Codec(#[from] slirc_proto::ProtocolError),
}

// ============================================================================
// Plugin Errors
// ============================================================================

/// Plugin module operation failures.
///
/// These are collected into load/unload reports; the runtime never returns
/// them through `?` to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("no module {0:?} is registered")]
    UnknownModule(String),

    #[error("module {module:?} has no unit {unit:?}")]
    UnknownUnit { module: String, unit: String },

    #[error("module {0:?} is not loaded")]
    NotLoaded(String),

    #[error("unit {unit:?} of module {module:?} is not loaded")]
    UnitNotLoaded { module: String, unit: String },

    #[error("could not instantiate {module:?} / {unit:?}: {reason}")]
    Instantiate {
        module: String,
        unit: String,
        reason: String,
    },

    #[error("{hook} handler of {module:?} / {unit:?} failed: {reason}")]
    Hook {
        module: String,
        unit: String,
        hook: &'static str,
        reason: String,
    },
}

impl PluginError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownModule(_) => "unknown_module",
            Self::UnknownUnit { .. } => "unknown_unit",
            Self::NotLoaded(_) => "not_loaded",
            Self::UnitNotLoaded { .. } => "unit_not_loaded",
            Self::Instantiate { .. } => "instantiate_failed",
            Self::Hook { .. } => "hook_failed",
        }
    }
}

// ============================================================================
// Timer Errors
// ============================================================================

/// Timer scheduler errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer {0:?} not found")]
    NotFound(String),
}
