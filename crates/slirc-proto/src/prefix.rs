//! Helpers for the optional sender segment of a line.
//!
//! A prefix is either a server name or a `nick!user@host` mask. The engine
//! only ever needs the nickname part, so no structured type is built here.

/// Extract the nickname from a `nick!user@host` prefix.
///
/// Everything before the first `!` is returned; a prefix without `!` is
/// returned whole.
pub fn nick_of(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}

/// Whether a target name refers to a channel (`#` or `&` prefixed).
pub fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&'])
}
