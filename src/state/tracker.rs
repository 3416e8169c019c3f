//! The State Tracker - the client's model of the server-side world.
//!
//! Every decoded event passes through [`StateTracker::update`] before any
//! plugin sees it. Mutations always touch both sides of the membership
//! relation, so after every event, for every channel `c` and nick `n`,
//! `n` is a member of `c` exactly when `c` is in `n.channels`.
//!
//! Plugins only get `&StateTracker`; the `resolve_*` methods hand out a
//! detached value for unknown names instead of inserting one.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use slirc_proto::numeric::{RPL_ENDOFNAMES, RPL_NAMREPLY, RPL_TOPIC, RPL_WELCOME};
use slirc_proto::{Event, ModeDirection, parse_channel_modes, parse_user_modes};
use tracing::debug;

use super::channel::{Channel, MemberModes};
use super::nick::Nick;
use crate::plugins::DISCONNECT;

/// Channel and nick bookkeeping for one connection.
#[derive(Debug, Default)]
pub struct StateTracker {
    me: String,
    user_modes: BTreeSet<char>,
    channels: HashMap<String, Channel>,
    nicks: HashMap<String, Nick>,
}

impl StateTracker {
    /// Create an empty tracker. The own nickname is learned from `001`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the model.
    pub fn update(&mut self, event: &Event) {
        match event.command.as_str() {
            "JOIN" => self.handle_join(event),
            "PART" => self.handle_part(event),
            "KICK" => self.handle_kick(event),
            "QUIT" => self.handle_quit(event),
            "NICK" => self.handle_nick(event),
            "MODE" => self.handle_mode(event),
            "TOPIC" => self.handle_topic(event),
            RPL_WELCOME => self.handle_welcome(event),
            RPL_TOPIC => self.handle_topic_reply(event),
            RPL_NAMREPLY => self.handle_names(event),
            RPL_ENDOFNAMES => self.handle_end_of_names(event),
            DISCONNECT => self.handle_disconnect(),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Own nickname (empty before registration).
    pub fn me(&self) -> &str {
        &self.me
    }

    /// Whether `nick` is the bot itself.
    pub fn is_me(&self, nick: &str) -> bool {
        !self.me.is_empty() && nick == self.me
    }

    /// Own nick, detached if the bot shares no channel yet.
    pub fn me_nick(&self) -> Cow<'_, Nick> {
        self.resolve_nick(&self.me, None)
    }

    /// Own user modes.
    pub fn user_modes(&self) -> &BTreeSet<char> {
        &self.user_modes
    }

    /// Look up a tracked channel.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Look up a tracked nick.
    pub fn nick(&self, name: &str) -> Option<&Nick> {
        self.nicks.get(name)
    }

    /// All tracked channels, sorted by name.
    pub fn channels(&self) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self.channels.values().collect();
        channels.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        channels
    }

    /// All tracked nicks, in no particular order.
    pub fn nicks(&self) -> impl Iterator<Item = &Nick> {
        self.nicks.values()
    }

    /// Resolve a nick by name.
    ///
    /// Unknown names yield a detached [`Nick`] seeded with `host`; it is not
    /// added to the model.
    pub fn resolve_nick(&self, name: &str, host: Option<&str>) -> Cow<'_, Nick> {
        match self.nicks.get(name) {
            Some(nick) => Cow::Borrowed(nick),
            None => Cow::Owned(Nick::new(name, host.unwrap_or_default())),
        }
    }

    /// Resolve a channel by name, detached if unknown.
    pub fn resolve_channel(&self, name: &str) -> Cow<'_, Channel> {
        match self.channels.get(name) {
            Some(channel) => Cow::Borrowed(channel),
            None => Cow::Owned(Channel::new(name)),
        }
    }

    /// Membership modes of `nick` in `channel`.
    pub fn member_modes(&self, channel: &str, nick: &str) -> Option<&MemberModes> {
        self.channels.get(channel)?.member_modes(nick)
    }

    /// Channels shared with `nick`.
    pub fn common_channels(&self, nick: &str) -> Vec<&Channel> {
        self.nicks
            .get(nick)
            .map(|n| n.channels.iter().filter_map(|c| self.channels.get(c)).collect())
            .unwrap_or_default()
    }

    /// Members of `channel` as nick records.
    pub fn channel_nicks(&self, channel: &str) -> Vec<&Nick> {
        self.channels
            .get(channel)
            .map(|c| c.nicks().into_iter().filter_map(|n| self.nicks.get(n)).collect())
            .unwrap_or_default()
    }

    /// Check the membership relation in both directions.
    pub fn is_consistent(&self) -> bool {
        let members_linked = self.channels.values().all(|channel| {
            channel.members.keys().all(|nick| {
                self.nicks
                    .get(nick)
                    .is_some_and(|n| n.channels.contains(&channel.name))
            })
        });
        let channels_linked = self.nicks.values().all(|nick| {
            !nick.channels.is_empty()
                && nick.channels.iter().all(|name| {
                    self.channels
                        .get(name)
                        .is_some_and(|c| c.members.contains_key(&nick.name))
                })
        });
        members_linked && channels_linked
    }

    // ------------------------------------------------------------------
    // Linking helpers
    // ------------------------------------------------------------------

    fn add_member(&mut self, channel: &str, nick: &str, modes: MemberModes, host: &str) {
        let Some(chan) = self.channels.get_mut(channel) else {
            return;
        };
        chan.members.entry(nick.to_string()).or_default().extend(&modes);

        let entry = self
            .nicks
            .entry(nick.to_string())
            .or_insert_with(|| Nick::new(nick, host));
        if entry.host.is_empty() && !host.is_empty() {
            entry.host = host.to_string();
        }
        entry.channels.insert(channel.to_string());
    }

    fn remove_member(&mut self, channel: &str, nick: &str) {
        if let Some(chan) = self.channels.get_mut(channel) {
            chan.members.remove(nick);
        }
        if let Some(entry) = self.nicks.get_mut(nick) {
            entry.channels.remove(channel);
            if entry.channels.is_empty() {
                self.nicks.remove(nick);
            }
        }
    }

    fn remove_channel(&mut self, channel: &str) {
        let Some(chan) = self.channels.remove(channel) else {
            return;
        };
        debug!(channel = %channel, "Dropping channel");
        for nick in chan.members.keys() {
            if let Some(entry) = self.nicks.get_mut(nick) {
                entry.channels.remove(channel);
                if entry.channels.is_empty() {
                    self.nicks.remove(nick);
                }
            }
        }
    }

    fn remove_nick(&mut self, nick: &str) {
        let Some(entry) = self.nicks.remove(nick) else {
            return;
        };
        for channel in &entry.channels {
            if let Some(chan) = self.channels.get_mut(channel) {
                chan.members.remove(nick);
            }
        }
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    fn handle_welcome(&mut self, event: &Event) {
        if let Some(nick) = event.arg(0) {
            debug!(nick = %nick, "Registered");
            self.me = nick.to_string();
        }
    }

    fn handle_disconnect(&mut self) {
        self.channels.clear();
        self.nicks.clear();
        self.user_modes.clear();
    }

    fn handle_join(&mut self, event: &Event) {
        let Some(channel) = event.arg(0) else {
            return;
        };
        let nick = event.nick();
        if self.is_me(nick) {
            // A rejoin after a missed PART starts from a fresh member list.
            self.remove_channel(channel);
        }
        if !self.channels.contains_key(channel) {
            self.channels
                .insert(channel.to_string(), Channel::new(channel));
        }
        self.add_member(channel, nick, MemberModes::new(), &event.prefix);
    }

    fn handle_part(&mut self, event: &Event) {
        let Some(channel) = event.arg(0) else {
            return;
        };
        let nick = event.nick();
        if self.is_me(nick) {
            self.remove_channel(channel);
        } else {
            self.remove_member(channel, nick);
        }
    }

    fn handle_kick(&mut self, event: &Event) {
        let (Some(channel), Some(target)) = (event.arg(0), event.arg(1)) else {
            return;
        };
        if self.is_me(target) {
            self.remove_channel(channel);
        } else {
            self.remove_member(channel, target);
        }
    }

    fn handle_quit(&mut self, event: &Event) {
        self.remove_nick(event.nick());
    }

    fn handle_nick(&mut self, event: &Event) {
        let Some(new) = event.arg(0) else {
            return;
        };
        let old = event.nick();
        if self.is_me(old) {
            self.me = new.to_string();
        }
        if old == new {
            return;
        }
        let Some(mut entry) = self.nicks.remove(old) else {
            return;
        };
        // A stale record under the new name would leave dangling links.
        self.remove_nick(new);

        for channel in &entry.channels {
            if let Some(chan) = self.channels.get_mut(channel)
                && let Some(modes) = chan.members.remove(old)
            {
                chan.members.insert(new.to_string(), modes);
            }
        }
        entry.name = new.to_string();
        self.nicks.insert(new.to_string(), entry);
    }

    fn handle_mode(&mut self, event: &Event) {
        let (Some(target), Some(modestring)) = (event.arg(0), event.arg(1)) else {
            return;
        };

        if self.is_me(target) {
            for change in parse_user_modes(modestring) {
                match change.direction {
                    ModeDirection::Add => self.user_modes.insert(change.mode),
                    ModeDirection::Remove => self.user_modes.remove(&change.mode),
                };
            }
            return;
        }

        let Some(chan) = self.channels.get_mut(target) else {
            return;
        };
        for change in parse_channel_modes(modestring, &event.args[2..]) {
            if !change.is_membership() {
                continue;
            }
            let Some(modes) = change.arg.as_deref().and_then(|n| chan.members.get_mut(n)) else {
                continue;
            };
            match change.direction {
                ModeDirection::Add => modes.insert(change.mode),
                ModeDirection::Remove => modes.remove(change.mode),
            }
        }
    }

    fn handle_topic(&mut self, event: &Event) {
        if let (Some(channel), Some(topic)) = (event.arg(0), event.arg(1))
            && let Some(chan) = self.channels.get_mut(channel)
        {
            chan.topic = topic.to_string();
        }
    }

    fn handle_topic_reply(&mut self, event: &Event) {
        if let (Some(channel), Some(topic)) = (event.arg(1), event.arg(2))
            && let Some(chan) = self.channels.get_mut(channel)
        {
            chan.topic = topic.to_string();
        }
    }

    fn handle_names(&mut self, event: &Event) {
        let (Some(channel), Some(names)) = (event.arg(2), event.arg(3)) else {
            return;
        };
        let chan = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| Channel::new(channel));

        // A listing after the end marker replaces the previous one. Old
        // members are unlinked but their records are kept until the new
        // listing is merged, so returning nicks keep their host.
        let mut previous = Vec::new();
        if !chan.names_pending {
            chan.names_pending = true;
            previous = chan.members.drain().map(|(nick, _)| nick).collect();
            for nick in &previous {
                if let Some(entry) = self.nicks.get_mut(nick) {
                    entry.channels.remove(channel);
                }
            }
        }

        for token in names.split_whitespace() {
            let (nick, modes) = MemberModes::from_names_token(token);
            if !nick.is_empty() {
                self.add_member(channel, nick, modes, "");
            }
        }

        for nick in previous {
            if self.nicks.get(&nick).is_some_and(|n| n.channels.is_empty()) {
                self.nicks.remove(&nick);
            }
        }
    }

    fn handle_end_of_names(&mut self, event: &Event) {
        if let Some(chan) = event.arg(1).and_then(|c| self.channels.get_mut(c)) {
            chan.names_pending = false;
        }
    }
}
