//! Decoded protocol events.
//!
//! An [`Event`] is the `(prefix, command, args)` triple produced for every
//! complete inbound line. Synthetic events generated inside the client
//! (disconnect, signals, load/unload) use the same shape with an empty or
//! made-up prefix.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, Result};
use crate::prefix::nick_of;

/// A single decoded line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Event {
    /// Sender identity without the leading `:`; empty when absent.
    pub prefix: String,
    /// Command token (or numeric) exactly as received.
    pub command: String,
    /// Arguments; a trailing argument may contain spaces.
    pub args: Vec<String>,
}

impl Event {
    /// Create an event from its parts.
    pub fn new(
        prefix: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a prefix-less event with no arguments.
    pub fn synthetic(command: impl Into<String>) -> Self {
        Self {
            prefix: String::new(),
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Parse one line (without its terminator).
    ///
    /// The parse is lenient: a leading `:` splits off the prefix up to the
    /// first space, the first ` :` starts the trailing argument, and the rest
    /// is split on whitespace. The first token becomes the command.
    pub fn parse(line: &str) -> Result<Self> {
        if line.trim().is_empty() {
            return Err(ProtocolError::EmptyLine);
        }

        let mut rest = line;
        let mut prefix = "";

        if let Some(stripped) = rest.strip_prefix(':') {
            match stripped.split_once(' ') {
                Some((p, remainder)) => {
                    prefix = p;
                    rest = remainder;
                }
                None => return Err(ProtocolError::MissingCommand(line.to_string())),
            }
        }

        let mut args: Vec<String> = match rest.split_once(" :") {
            Some((head, trailing)) => {
                let mut args: Vec<String> = head.split_whitespace().map(String::from).collect();
                args.push(trailing.to_string());
                args
            }
            None => rest.split_whitespace().map(String::from).collect(),
        };

        if args.is_empty() {
            return Err(ProtocolError::MissingCommand(line.to_string()));
        }
        let command = args.remove(0);

        Ok(Self {
            prefix: prefix.to_string(),
            command,
            args,
        })
    }

    /// Get the nth argument, if present.
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args.get(n).map(String::as_str)
    }

    /// Nickname part of the prefix.
    pub fn nick(&self) -> &str {
        nick_of(&self.prefix)
    }

    /// Whether this event carries the given command (case-sensitive).
    pub fn is(&self, command: &str) -> bool {
        self.command == command
    }
}

impl FromStr for Event {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Serializes back to wire syntax (without the line terminator).
///
/// The last argument is written as a trailing argument whenever it is
/// empty, contains whitespace or starts with `:`.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, ":{} ", self.prefix)?;
        }
        f.write_str(&self.command)?;

        if let Some((last, leading)) = self.args.split_last() {
            for arg in leading {
                write!(f, " {}", arg)?;
            }
            if last.is_empty() || last.contains(char::is_whitespace) || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_prefix_and_trailing() {
        let event = Event::parse(":alice!u@h PRIVMSG #chan :hello there").unwrap();
        assert_eq!(event.prefix, "alice!u@h");
        assert_eq!(event.command, "PRIVMSG");
        assert_eq!(event.args, vec!["#chan", "hello there"]);
        assert_eq!(event.nick(), "alice");
    }

    #[test]
    fn test_parse_without_prefix() {
        let event = Event::parse("PING :irc.example.net").unwrap();
        assert_eq!(event.prefix, "");
        assert_eq!(event.command, "PING");
        assert_eq!(event.args, vec!["irc.example.net"]);
    }

    #[test]
    fn test_parse_no_trailing() {
        let event = Event::parse(":srv MODE #chan +ov alice bob").unwrap();
        assert_eq!(event.command, "MODE");
        assert_eq!(event.args, vec!["#chan", "+ov", "alice", "bob"]);
    }

    #[test]
    fn test_parse_trailing_keeps_embedded_spaces_and_colons() {
        let event = Event::parse(":srv 353 bot = #chan :alice @bob  +carol :x").unwrap();
        assert_eq!(event.args[3], "alice @bob  +carol :x");
    }

    #[test]
    fn test_parse_collapses_whitespace_in_leading_args() {
        let event = Event::parse("JOIN    #a   key").unwrap();
        assert_eq!(event.args, vec!["#a", "key"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let event = Event::parse(":nick!u@h PART #chan :").unwrap();
        assert_eq!(event.args, vec!["#chan", ""]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Event::parse(""), Err(ProtocolError::EmptyLine)));
        assert!(matches!(Event::parse("   "), Err(ProtocolError::EmptyLine)));
        assert!(matches!(
            Event::parse(":onlyprefix"),
            Err(ProtocolError::MissingCommand(_))
        ));
        assert!(matches!(
            Event::parse(":prefix "),
            Err(ProtocolError::MissingCommand(_))
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        let raw = ":alice!u@h PRIVMSG #chan :hello there";
        let event = Event::parse(raw).unwrap();
        assert_eq!(event.to_string(), raw);

        let raw = "NICK bot";
        assert_eq!(Event::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn test_display_forces_trailing_marker() {
        let event = Event::new("", "PRIVMSG", ["#c", ":)"]);
        assert_eq!(event.to_string(), "PRIVMSG #c ::)");
        let event = Event::new("", "TOPIC", ["#c", ""]);
        assert_eq!(event.to_string(), "TOPIC #c :");
    }

    #[test]
    fn test_synthetic() {
        let event = Event::synthetic("_DISCONNECT");
        assert!(event.prefix.is_empty());
        assert!(event.args.is_empty());
        assert!(event.is("_DISCONNECT"));
        assert_eq!(event.arg(0), None);
    }
}
