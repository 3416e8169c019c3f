//! CRLF line codec for tokio.
//!
//! This module provides a codec that frames the inbound byte stream into
//! complete `\r\n`-terminated lines and parses each one into an [`Event`].
//! Bytes after the last terminator stay in the buffer until more data
//! arrives, so a stream split at any byte offset decodes identically.
//!
//! Lines that are not valid UTF-8 are decoded with a single-byte fallback
//! encoding (ISO-8859-1 by default). A line that neither encoding accepts,
//! or that does not parse, is dropped with a warning; it never ends the
//! stream.

use bytes::BytesMut;
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{self, ProtocolError};
use crate::event::Event;

/// Encoding label used when a line is not valid UTF-8.
pub const DEFAULT_FALLBACK_ENCODING: &str = "iso-8859-1";

const CRLF: &[u8] = b"\r\n";

/// Line codec producing [`Event`]s from `\r\n`-terminated lines.
#[derive(Debug, Clone)]
pub struct LineCodec {
    fallback: &'static Encoding,
    /// Index of the next byte to scan for a terminator.
    next_index: usize,
}

impl LineCodec {
    /// Create a codec with the default fallback encoding.
    pub fn new() -> Self {
        // WHATWG maps the default label onto windows-1252.
        let fallback = Encoding::for_label(DEFAULT_FALLBACK_ENCODING.as_bytes())
            .unwrap_or(encoding::WINDOWS_1252);
        Self {
            fallback,
            next_index: 0,
        }
    }

    /// Create a codec with a custom fallback encoding.
    ///
    /// # Arguments
    /// * `label` - WHATWG encoding label (e.g., "iso-8859-1", "koi8-r")
    pub fn with_fallback(label: &str) -> error::Result<Self> {
        let fallback = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ProtocolError::UnknownEncoding(label.to_string()))?;
        Ok(Self {
            fallback,
            next_index: 0,
        })
    }

    /// Name of the fallback encoding in use.
    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Decode raw line bytes: UTF-8 first, then the fallback encoding.
    ///
    /// Returns `None` when neither accepts the bytes.
    pub fn decode_text(&self, raw: &[u8]) -> Option<String> {
        if let Ok(text) = std::str::from_utf8(raw) {
            return Some(text.to_string());
        }
        self.fallback
            .decode_without_bom_handling_and_without_replacement(raw)
            .map(|cow| cow.into_owned())
    }

    /// Split the next complete line off the buffer, without its terminator.
    fn next_line(&mut self, src: &mut BytesMut) -> Option<BytesMut> {
        // A terminator may straddle the previous scan boundary.
        let start = self.next_index.saturating_sub(1).min(src.len());
        match src[start..].windows(CRLF.len()).position(|w| w == CRLF) {
            Some(offset) => {
                let mut line = src.split_to(start + offset + CRLF.len());
                line.truncate(line.len() - CRLF.len());
                self.next_index = 0;
                Some(line)
            }
            None => {
                self.next_index = src.len();
                None
            }
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Event;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Event>> {
        while let Some(raw) = self.next_line(src) {
            if raw.is_empty() {
                continue;
            }

            let Some(text) = self.decode_text(&raw) else {
                warn!(
                    bytes = raw.len(),
                    encoding = self.fallback.name(),
                    "Could not decode line, dropping it"
                );
                continue;
            };

            match Event::parse(&text) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    warn!(line = %text, error = %e, "Could not parse line, dropping it");
                }
            }
        }
        Ok(None)
    }
}

impl<'a> Encoder<&'a str> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: &'a str, dst: &mut BytesMut) -> error::Result<()> {
        let wire = encode_line(line);
        dst.extend_from_slice(&wire);
        Ok(())
    }
}

/// Format one outgoing command into wire bytes.
///
/// The command is truncated at its first embedded `\r` or `\n` so a single
/// call can never emit more than one line, then `\r\n` is appended and the
/// result encoded as UTF-8.
pub fn encode_line(command: &str) -> Vec<u8> {
    let end = command.find(['\r', '\n']).unwrap_or(command.len());
    let mut wire = Vec::with_capacity(end + CRLF.len());
    wire.extend_from_slice(command[..end].as_bytes());
    wire.extend_from_slice(CRLF);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(event) = codec.decode(buf).unwrap() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :test\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some(Event::new("", "PING", ["test"])));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line_is_retained() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :te");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"PING :te");

        buf.extend_from_slice(b"st\r\nNICK");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Event::new("", "PING", ["test"]))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"NICK");
    }

    #[test]
    fn test_decode_terminator_split_across_reads() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :x\r");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Event::new("", "PING", ["x"]))
        );
    }

    #[test]
    fn test_decode_multiple_lines_in_one_read() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(":a!u@h JOIN #c\r\n:b!u@h JOIN #c\r\n:c!u@h");
        let events = decode_all(&mut codec, &mut buf);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].nick(), "b");
        assert_eq!(&buf[..], b":c!u@h");
    }

    #[test]
    fn test_decode_skips_empty_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("\r\n\r\nPING :x\r\n");
        let events = decode_all(&mut codec, &mut buf);
        assert_eq!(events, vec![Event::new("", "PING", ["x"])]);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"PRIVMSG #c :caf\xe9\r\n");

        let event = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(event.args[1], "café");
    }

    #[test]
    fn test_decode_drops_undecodable_line() {
        // A lead byte followed by a space is invalid in both UTF-8 and Shift_JIS.
        let mut codec = LineCodec::with_fallback("shift_jis").unwrap();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"PRIVMSG #c :\x81\x20\r\nPING :ok\r\n");

        let events = decode_all(&mut codec, &mut buf);
        assert_eq!(events, vec![Event::new("", "PING", ["ok"])]);
    }

    #[test]
    fn test_decode_drops_unparseable_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(":prefixonly\r\nPING :ok\r\n");
        let events = decode_all(&mut codec, &mut buf);
        assert_eq!(events, vec![Event::new("", "PING", ["ok"])]);
    }

    #[test]
    fn test_default_fallback_follows_label() {
        let labelled = LineCodec::with_fallback(DEFAULT_FALLBACK_ENCODING).unwrap();
        assert_eq!(LineCodec::new().fallback_name(), labelled.fallback_name());
    }

    #[test]
    fn test_unknown_fallback_label() {
        assert!(matches!(
            LineCodec::with_fallback("not-an-encoding"),
            Err(ProtocolError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_encode() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("PONG :test", &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :test\r\n");
    }

    #[test]
    fn test_encode_line_truncates_embedded_newline() {
        assert_eq!(
            encode_line("PRIVMSG #c :hello\r\nQUIT"),
            b"PRIVMSG #c :hello\r\n".to_vec()
        );
        assert_eq!(encode_line("NICK bot\nx"), b"NICK bot\r\n".to_vec());
    }

    #[test]
    fn test_encode_line_utf8_length() {
        assert_eq!(encode_line("PRIVMSG #c :é").len(), "PRIVMSG #c :é".len() + 2);
    }
}
