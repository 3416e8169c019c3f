use std::collections::BTreeSet;

/// A participant seen in at least one shared channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nick {
    pub name: String,
    /// Hostmask as last observed; empty until seen in a prefix.
    pub host: String,
    /// Services account, when known.
    pub account: Option<String>,
    /// Names of shared channels.
    pub channels: BTreeSet<String>,
}

impl Nick {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            account: None,
            channels: BTreeSet::new(),
        }
    }

    /// Whether this nick shares the given channel.
    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }
}
