//! Per-connection session state.
//!
//! A [`Session`] is rebuilt for every connect attempt: the read assembly
//! buffer, the line codec position and the registration flag never carry
//! over from a previous connection.

use bytes::BytesMut;
use slirc_proto::{Event, LineCodec, ProtocolError};
use tokio_util::codec::Decoder;

/// Connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Registered,
}

/// Buffers and flags for the current connection.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    codec: LineCodec,
    read_buf: BytesMut,
    /// Set once the server confirmed registration; survives the disconnect
    /// so the backoff can see how the cycle went.
    registered: bool,
    nick_retries: u32,
}

impl Session {
    /// Create a disconnected session decoding with `fallback_encoding`.
    pub fn new(fallback_encoding: &str) -> Result<Self, ProtocolError> {
        Ok(Self {
            state: SessionState::Disconnected,
            codec: LineCodec::with_fallback(fallback_encoding)?,
            read_buf: BytesMut::new(),
            registered: false,
            nick_retries: 0,
        })
    }

    /// Reset everything for a new connect attempt.
    pub fn begin_connect(&mut self) {
        self.codec = LineCodec::with_fallback(self.codec.fallback_name())
            .unwrap_or_default();
        self.read_buf.clear();
        self.registered = false;
        self.nick_retries = 0;
        self.state = SessionState::Connecting;
    }

    pub fn connected(&mut self) {
        self.state = SessionState::Connected;
    }

    pub fn mark_registered(&mut self) {
        self.registered = true;
        self.state = SessionState::Registered;
    }

    /// Transport gone; drops any partial line.
    pub fn disconnected(&mut self) {
        self.read_buf.clear();
        self.state = SessionState::Disconnected;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registered(&self) -> bool {
        self.registered
    }

    /// Count one nickname collision retry and return the new total.
    pub fn bump_nick_retries(&mut self) -> u32 {
        self.nick_retries += 1;
        self.nick_retries
    }

    pub fn nick_retries(&self) -> u32 {
        self.nick_retries
    }

    pub fn read_buf_mut(&mut self) -> &mut BytesMut {
        &mut self.read_buf
    }

    /// Next complete event from the read buffer, if any.
    pub fn next_event(&mut self) -> Result<Option<Event>, ProtocolError> {
        self.codec.decode(&mut self.read_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_connect_resets() {
        let mut session = Session::new("iso-8859-1").unwrap();
        session.read_buf_mut().extend_from_slice(b"PING :half");
        session.mark_registered();
        session.bump_nick_retries();

        session.begin_connect();
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.registered());
        assert_eq!(session.nick_retries(), 0);
        assert!(session.read_buf_mut().is_empty());
    }

    #[test]
    fn test_registered_survives_disconnect() {
        let mut session = Session::new("iso-8859-1").unwrap();
        session.begin_connect();
        session.connected();
        session.mark_registered();
        session.disconnected();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.registered());
    }

    #[test]
    fn test_decodes_from_read_buffer() {
        let mut session = Session::new("iso-8859-1").unwrap();
        session.read_buf_mut().extend_from_slice(b"PING :a\r\nPING :b\r\nPI");
        assert_eq!(session.next_event().unwrap().unwrap().args, vec!["a"]);
        assert_eq!(session.next_event().unwrap().unwrap().args, vec!["b"]);
        assert!(session.next_event().unwrap().is_none());
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        assert!(Session::new("no-such-charset").is_err());
    }
}
