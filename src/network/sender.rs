//! Flow-Controlled Sender.
//!
//! The server throttles or drops clients that flood it, and gives no
//! signal about how much of our output it has consumed. The sender keeps a
//! byte budget: once the next line would push the unacknowledged total past
//! the ceiling it stops, emits a sentinel (a deliberately unknown command)
//! and parks further commands in an overflow queue. The server's "unknown
//! command" reply echoing the sentinel proves everything before it was
//! processed; the budget is then reset and the overflow replayed.
//!
//! Enqueuing and writing are separate: [`FlowControlledSender::send`] only
//! appends wire bytes to an outbox that the connection loop flushes.

use std::collections::VecDeque;

use bytes::BytesMut;
use slirc_proto::numeric::ERR_UNKNOWNCOMMAND;
use slirc_proto::{Event, encode_line};
use tracing::{debug, info};

use crate::config::FloodConfig;
use crate::engine::CommandSink;

/// Decides whether an inbound event acknowledges the sentinel.
pub trait FlowAck: Send {
    fn is_ack(&self, event: &Event, sentinel: &str) -> bool;
}

/// Matches `421 <nick> <sentinel> :Unknown command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownCommandAck;

impl FlowAck for UnknownCommandAck {
    fn is_ack(&self, event: &Event, sentinel: &str) -> bool {
        event.command == ERR_UNKNOWNCOMMAND && event.arg(1) == Some(sentinel)
    }
}

/// Outgoing queue with a self-imposed byte budget.
pub struct FlowControlledSender {
    ceiling: usize,
    sentinel: String,
    ack: Box<dyn FlowAck>,
    bytes_buffered: usize,
    send_allowed: bool,
    pending_overflow: VecDeque<String>,
    outbox: BytesMut,
}

impl FlowControlledSender {
    pub fn new(flood: &FloodConfig) -> Self {
        Self {
            ceiling: flood.ceiling,
            sentinel: flood.sentinel.clone(),
            ack: Box::new(UnknownCommandAck),
            bytes_buffered: 0,
            send_allowed: true,
            pending_overflow: VecDeque::new(),
            outbox: BytesMut::new(),
        }
    }

    /// Replace the acknowledgment strategy.
    pub fn with_ack(mut self, ack: impl FlowAck + 'static) -> Self {
        self.ack = Box::new(ack);
        self
    }

    /// Queue one command for transmission, subject to the budget.
    pub fn send(&mut self, command: &str) {
        self.enqueue(command.to_string(), false);
    }

    /// Feed an inbound event. Returns `true` if it acknowledged the sentinel,
    /// in which case the overflow has been replayed.
    ///
    /// An echo arriving while sending is allowed still resets the budget:
    /// everything written before it has been read by the server.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        if !self.ack.is_ack(event, &self.sentinel) {
            return false;
        }
        self.acknowledge();
        true
    }

    /// Reset the budget and replay parked commands, oldest first, until
    /// the budget trips again or nothing is left.
    pub fn acknowledge(&mut self) {
        debug!(
            pending = self.pending_overflow.len(),
            "Flow control acknowledged"
        );
        self.bytes_buffered = 0;
        self.send_allowed = true;
        while self.send_allowed {
            let Some(command) = self.pending_overflow.pop_front() else {
                break;
            };
            self.enqueue(command, true);
        }
    }

    /// Forget all state, for a fresh connection.
    pub fn reset(&mut self) {
        self.bytes_buffered = 0;
        self.send_allowed = true;
        self.pending_overflow.clear();
        self.outbox.clear();
    }

    fn enqueue(&mut self, command: String, replaying: bool) {
        if !self.send_allowed {
            self.pending_overflow.push_back(command);
            return;
        }

        let wire = encode_line(&command);
        let fits = self.bytes_buffered + wire.len() <= self.ceiling;
        // A line larger than the whole budget can never fit; after an ack it
        // goes out alone and the budget trips right behind it.
        let oversized = replaying && self.bytes_buffered == 0;

        if fits || oversized {
            debug!("-> {}", command);
            self.outbox.extend_from_slice(&wire);
            self.bytes_buffered += wire.len();
            if !fits {
                self.trip();
            }
            return;
        }

        self.trip();
        self.pending_overflow.push_front(command);
    }

    fn trip(&mut self) {
        info!(
            buffered = self.bytes_buffered,
            ceiling = self.ceiling,
            "Send budget exhausted, waiting for the server"
        );
        debug!("-> {}", self.sentinel);
        self.send_allowed = false;
        self.outbox.extend_from_slice(&encode_line(&self.sentinel));
    }

    /// Take everything queued for writing.
    pub fn take_outbox(&mut self) -> BytesMut {
        self.outbox.split()
    }

    pub fn has_output(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn bytes_buffered(&self) -> usize {
        self.bytes_buffered
    }

    pub fn send_allowed(&self) -> bool {
        self.send_allowed
    }

    pub fn pending_overflow(&self) -> &VecDeque<String> {
        &self.pending_overflow
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }
}

impl CommandSink for FlowControlledSender {
    fn send(&mut self, command: &str) {
        FlowControlledSender::send(self, command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sender() -> FlowControlledSender {
        FlowControlledSender::new(&FloodConfig::default())
    }

    fn written(sender: &mut FlowControlledSender) -> Vec<String> {
        let bytes = sender.take_outbox();
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .split_terminator("\r\n")
            .map(String::from)
            .collect()
    }

    fn ack() -> Event {
        Event::parse(":srv 421 bot SPLIDGEPLOIT :Unknown command").unwrap()
    }

    #[test]
    fn test_small_sends_go_straight_out() {
        let mut s = sender();
        s.send("NICK bot");
        s.send("USER bot * * :Bot");
        assert_eq!(s.bytes_buffered(), "NICK bot\r\n".len() + "USER bot * * :Bot\r\n".len());
        assert_eq!(written(&mut s), vec!["NICK bot", "USER bot * * :Bot"]);
    }

    #[test]
    fn test_oversized_line_waits_for_ack() {
        let mut s = sender();
        let big = "A".repeat(2000);
        s.send(&big);

        assert_eq!(written(&mut s), vec!["SPLIDGEPLOIT"]);
        assert!(!s.send_allowed());
        assert_eq!(s.pending_overflow().len(), 1);

        // Unrelated traffic does not release it.
        assert!(!s.handle_event(&Event::parse(":srv 421 bot FOO :Unknown command").unwrap()));
        assert!(!s.handle_event(&Event::parse("PING :x").unwrap()));
        assert!(s.take_outbox().is_empty());

        assert!(s.handle_event(&ack()));
        assert_eq!(written(&mut s), vec![big, "SPLIDGEPLOIT".to_string()]);
        assert!(s.pending_overflow().is_empty());
        assert!(!s.send_allowed());
    }

    #[test]
    fn test_overflow_replays_in_order_and_can_retrip() {
        let mut s = sender();
        let line = |i: usize| format!("PRIVMSG #c :{i:03} {}", "x".repeat(300));
        for i in 0..8 {
            s.send(&line(i));
        }
        // Three 318-byte lines fit in 1024.
        assert_eq!(written(&mut s), vec![line(0), line(1), line(2), "SPLIDGEPLOIT".into()]);
        assert_eq!(s.pending_overflow().len(), 5);

        s.send("LATE");
        assert_eq!(s.pending_overflow().back().map(String::as_str), Some("LATE"));

        assert!(s.handle_event(&ack()));
        assert_eq!(written(&mut s), vec![line(3), line(4), line(5), "SPLIDGEPLOIT".into()]);

        assert!(s.handle_event(&ack()));
        assert_eq!(written(&mut s), vec![line(6), line(7), "LATE".into()]);
        assert!(s.send_allowed());
    }

    #[test]
    fn test_ack_while_allowed_resets_budget() {
        let mut s = sender();
        s.send("PING :x");
        assert_eq!(s.bytes_buffered(), "PING :x\r\n".len());

        assert!(s.handle_event(&ack()));
        assert_eq!(s.bytes_buffered(), 0);
        assert!(s.send_allowed());
        assert_eq!(written(&mut s), vec!["PING :x"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = sender();
        s.send(&"B".repeat(2000));
        s.reset();
        assert!(s.send_allowed());
        assert_eq!(s.bytes_buffered(), 0);
        assert!(s.pending_overflow().is_empty());
        assert!(!s.has_output());
    }

    struct NoticeAck;

    impl FlowAck for NoticeAck {
        fn is_ack(&self, event: &Event, sentinel: &str) -> bool {
            event.command == "NOTICE" && event.arg(1) == Some(sentinel)
        }
    }

    #[test]
    fn test_custom_ack_strategy() {
        let mut s = sender().with_ack(NoticeAck);
        s.send(&"C".repeat(2000));
        assert!(!s.handle_event(&ack()));
        assert!(s.handle_event(&Event::parse(":srv NOTICE bot SPLIDGEPLOIT").unwrap()));
    }

    proptest! {
        #[test]
        fn budget_is_respected(
            lengths in proptest::collection::vec(1usize..700, 1..40),
            ack_every in 1usize..6,
        ) {
            let mut s = sender();
            let mut sent = 0usize;
            let mut total_out = 0usize;
            for (i, len) in lengths.iter().enumerate() {
                s.send(&"Z".repeat(*len));
                sent += 1;
                if s.send_allowed() {
                    prop_assert!(s.bytes_buffered() <= s.ceiling());
                }
                if i % ack_every == 0 {
                    total_out += written(&mut s).iter().filter(|l| l.starts_with('Z')).count();
                    s.handle_event(&ack());
                }
            }
            // Keep acknowledging until the overflow drains.
            for _ in 0..(lengths.len() + 2) {
                total_out += written(&mut s).iter().filter(|l| l.starts_with('Z')).count();
                s.handle_event(&ack());
            }
            total_out += written(&mut s).iter().filter(|l| l.starts_with('Z')).count();
            prop_assert!(s.pending_overflow().is_empty());
            prop_assert_eq!(total_out, sent);
        }
    }
}
