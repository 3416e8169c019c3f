//! Channel-related types and state.

use std::collections::{BTreeSet, HashMap};

use slirc_proto::prefix_glyph_mode;

/// Membership glyphs in descending rank.
const RANKED_GLYPHS: [char; 5] = ['~', '&', '@', '%', '+'];

/// Member modes (op, voice, etc.).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemberModes {
    flags: BTreeSet<char>,
}

impl MemberModes {
    /// Create an empty mode set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the member holds this mode letter.
    pub fn contains(&self, mode: char) -> bool {
        self.flags.contains(&mode)
    }

    pub fn insert(&mut self, mode: char) {
        self.flags.insert(mode);
    }

    pub fn remove(&mut self, mode: char) {
        self.flags.remove(&mode);
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: &MemberModes) {
        self.flags.extend(other.flags.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Mode letters, sorted.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.flags.iter().copied()
    }

    /// Get the highest prefix character for this member.
    /// Priority: ~ > & > @ > % > +
    pub fn prefix_char(&self) -> Option<char> {
        RANKED_GLYPHS
            .into_iter()
            .find(|&glyph| prefix_glyph_mode(glyph).is_some_and(|mode| self.contains(mode)))
    }

    /// Check if this member has operator privileges (op or higher).
    pub fn is_op(&self) -> bool {
        self.contains('q') || self.contains('a') || self.contains('o')
    }

    /// Split the leading membership glyphs off a member-list token.
    ///
    /// `@+alice` yields `("alice", {o, v})`.
    pub fn from_names_token(token: &str) -> (&str, MemberModes) {
        let mut modes = MemberModes::new();
        let nick = token.trim_start_matches(|c: char| match prefix_glyph_mode(c) {
            Some(mode) => {
                modes.insert(mode);
                true
            }
            None => false,
        });
        (nick, modes)
    }
}

impl FromIterator<char> for MemberModes {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

/// A channel as seen from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub topic: String,
    /// Member nickname -> membership modes.
    pub members: HashMap<String, MemberModes>,
    /// True while a member list (353 ... 366) is being streamed in.
    pub names_pending: bool,
}

impl Channel {
    /// A fresh channel, awaiting its member list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: String::new(),
            members: HashMap::new(),
            names_pending: true,
        }
    }

    /// Whether a nickname is a member.
    pub fn has_member(&self, nick: &str) -> bool {
        self.members.contains_key(nick)
    }

    /// Member nicknames, sorted.
    pub fn nicks(&self) -> Vec<&str> {
        let mut nicks: Vec<&str> = self.members.keys().map(String::as_str).collect();
        nicks.sort_unstable();
        nicks
    }

    /// Modes held by a member, if it is one.
    pub fn member_modes(&self, nick: &str) -> Option<&MemberModes> {
        self.members.get(nick)
    }
}
