//! # slirc-proto
//!
//! A small library for the line-oriented IRC wire format as seen from a
//! client: CRLF framing, `(prefix, command, args)` events and mode strings.
//!
//! ## Features
//!
//! - CRLF line framing as a `tokio_util` [`Decoder`](tokio_util::codec::Decoder)
//!   / [`Encoder`](tokio_util::codec::Encoder) pair
//! - UTF-8 decoding with a configurable single-byte fallback encoding
//! - Lenient event parsing (optional `:prefix`, trailing ` :` argument)
//! - User and channel mode string parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_proto::Event;
//!
//! let event: Event = ":nick!user@host PRIVMSG #rust :Hello, world!".parse().unwrap();
//! assert_eq!(event.prefix, "nick!user@host");
//! assert_eq!(event.command, "PRIVMSG");
//! assert_eq!(event.args, vec!["#rust", "Hello, world!"]);
//! assert_eq!(event.nick(), "nick");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod line;
pub mod mode;
pub mod numeric;
pub mod prefix;

pub use self::error::{ProtocolError, Result};
pub use self::event::Event;
pub use self::line::{encode_line, LineCodec, DEFAULT_FALLBACK_ENCODING};
pub use self::mode::{
    parse_channel_modes, parse_user_modes, prefix_glyph_mode, ModeChange, ModeDirection,
};
pub use self::prefix::{is_channel, nick_of};
