//! Event kinds that handlers subscribe to.

use std::fmt;

use slirc_proto::numeric::RPL_WELCOME;

/// Synthetic event dispatched to a unit right after it is loaded.
pub const LOAD: &str = "_LOAD";
/// Synthetic event dispatched to a unit right before it is unloaded.
pub const UNLOAD: &str = "_UNLOAD";
/// Synthetic event dispatched once per lost connection.
pub const DISCONNECT: &str = "_DISCONNECT";
/// Broadcast signal between units; the prefix is `name!`.
pub const SIGNAL: &str = "_SIGNAL";
/// Catch-all subscription; never appears as an event command.
pub const RAW: &str = "_RAW";

/// What a handler answers to.
///
/// Protocol commands and numerics are matched exactly as received.
/// `Connect` is the registration confirmation (`001`), so subscribing to
/// `EventKind::command("001")` and `EventKind::Connect` is the same thing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Command(String),
    Load,
    Unload,
    Disconnect,
    Signal,
    Connect,
    Raw,
}

impl EventKind {
    /// Kind for a command token, mapping reserved names to their variant.
    pub fn command(name: &str) -> Self {
        match name {
            LOAD => EventKind::Load,
            UNLOAD => EventKind::Unload,
            DISCONNECT => EventKind::Disconnect,
            SIGNAL => EventKind::Signal,
            RAW => EventKind::Raw,
            RPL_WELCOME => EventKind::Connect,
            other => EventKind::Command(other.to_string()),
        }
    }

    /// Command token this kind corresponds to.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Command(name) => name,
            EventKind::Load => LOAD,
            EventKind::Unload => UNLOAD,
            EventKind::Disconnect => DISCONNECT,
            EventKind::Signal => SIGNAL,
            EventKind::Connect => RPL_WELCOME,
            EventKind::Raw => RAW,
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        EventKind::command(name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
