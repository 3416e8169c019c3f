//! Protocol replies the client makes on its own.
//!
//! These run for every inbound event before the world model and plugins
//! see it: keepalive pings are answered, and until the server confirms
//! registration a nickname collision is retried with the configured suffix.

use slirc_proto::Event;
use slirc_proto::numeric::{ERR_NICKNAMEINUSE, RPL_WELCOME};
use tracing::{info, warn};

use super::session::Session;
use crate::config::IdentityConfig;
use crate::engine::CommandSink;

pub fn handle(
    session: &mut Session,
    identity: &IdentityConfig,
    event: &Event,
    out: &mut dyn CommandSink,
) {
    if event.command == "PING" {
        out.send(&format!("PONG :{}", event.arg(0).unwrap_or_default()));
        return;
    }

    if session.registered() {
        return;
    }

    match event.command.as_str() {
        RPL_WELCOME => {
            info!(nick = event.arg(0).unwrap_or_default(), "Registered");
            session.mark_registered();
        }
        ERR_NICKNAMEINUSE => {
            let Some(rejected) = event.arg(1) else {
                return;
            };
            if let Some(limit) = identity.nick_retry_limit
                && session.nick_retries() >= limit
            {
                warn!(nick = rejected, limit, "Nickname retries exhausted");
                return;
            }
            session.bump_nick_retries();
            let nick = format!("{rejected}{}", identity.nick_suffix);
            info!(rejected, %nick, "Nickname in use, retrying");
            out.send(&format!("NICK {nick}"));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn setup() -> (Session, IdentityConfig, Vec<String>) {
        let mut session = Session::new("iso-8859-1").unwrap();
        session.begin_connect();
        session.connected();
        let identity = Config::new("localhost", 6667, "bot").identity;
        (session, identity, Vec::new())
    }

    fn feed(session: &mut Session, identity: &IdentityConfig, line: &str, out: &mut Vec<String>) {
        handle(session, identity, &Event::parse(line).unwrap(), out);
    }

    #[test]
    fn test_ping_is_answered() {
        let (mut session, identity, mut out) = setup();
        feed(&mut session, &identity, "PING :irc.example.net", &mut out);
        session.mark_registered();
        feed(&mut session, &identity, "PING 12345", &mut out);
        assert_eq!(out, vec!["PONG :irc.example.net", "PONG :12345"]);
    }

    #[test]
    fn test_welcome_registers() {
        let (mut session, identity, mut out) = setup();
        feed(&mut session, &identity, ":srv 001 bot :Welcome", &mut out);
        assert!(session.registered());
        assert!(out.is_empty());
    }

    #[test]
    fn test_nick_collision_appends_suffix() {
        let (mut session, identity, mut out) = setup();
        feed(&mut session, &identity, ":srv 433 * bot :Nickname is already in use", &mut out);
        feed(&mut session, &identity, ":srv 433 * bot` :Nickname is already in use", &mut out);
        assert_eq!(out, vec!["NICK bot`", "NICK bot``"]);
    }

    #[test]
    fn test_collision_after_registration_is_ignored() {
        let (mut session, identity, mut out) = setup();
        feed(&mut session, &identity, ":srv 001 bot :Welcome", &mut out);
        feed(&mut session, &identity, ":srv 433 bot other :Nickname is already in use", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_retry_limit() {
        let (mut session, mut identity, mut out) = setup();
        identity.nick_retry_limit = Some(1);
        feed(&mut session, &identity, ":srv 433 * bot :in use", &mut out);
        feed(&mut session, &identity, ":srv 433 * bot` :in use", &mut out);
        assert_eq!(out, vec!["NICK bot`"]);
    }
}
