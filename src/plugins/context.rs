//! The plugin-facing facade.
//!
//! Handlers never touch the sender, the scheduler or the runtime directly.
//! Everything they ask for is queued as an [`Action`] in [`Commands`] and
//! applied by the engine, in request order, once the current dispatch has
//! returned. Timer callbacks get the same [`Commands`] queue.

use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::config::Config;
use crate::state::{Channel, Nick, StateTracker};
use crate::timers::TimerCallback;

/// A deferred request from a plugin or timer.
pub enum Action {
    /// Send a raw command through the flow-controlled sender.
    Send(String),
    AddTimer {
        name: String,
        delay: Duration,
        reps: u32,
        callback: TimerCallback<Commands>,
    },
    DelTimer(String),
    /// Broadcast `_SIGNAL` with prefix `name!` to every unit.
    Signal { name: String, args: Vec<String> },
    Load { module: String, units: Vec<String> },
    Unload { module: String, units: Vec<String> },
    Reload { module: String },
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Send(line) => f.debug_tuple("Send").field(line).finish(),
            Action::AddTimer {
                name, delay, reps, ..
            } => f
                .debug_struct("AddTimer")
                .field("name", name)
                .field("delay", delay)
                .field("reps", reps)
                .finish_non_exhaustive(),
            Action::DelTimer(name) => f.debug_tuple("DelTimer").field(name).finish(),
            Action::Signal { name, args } => f
                .debug_struct("Signal")
                .field("name", name)
                .field("args", args)
                .finish(),
            Action::Load { module, units } => f
                .debug_struct("Load")
                .field("module", module)
                .field("units", units)
                .finish(),
            Action::Unload { module, units } => f
                .debug_struct("Unload")
                .field("module", module)
                .field("units", units)
                .finish(),
            Action::Reload { module } => f.debug_struct("Reload").field("module", module).finish(),
        }
    }
}

/// Command issuing and shared tables, available to handlers and timers.
#[derive(Debug, Default)]
pub struct Commands {
    queue: VecDeque<Action>,
    variables: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a raw protocol command.
    pub fn raw(&mut self, command: impl Into<String>) {
        self.queue.push_back(Action::Send(command.into()));
    }

    /// Join one or more comma-separated channels.
    pub fn join(&mut self, channels: &str, keys: Option<&str>) {
        match keys {
            Some(keys) => self.raw(format!("JOIN {channels} {keys}")),
            None => self.raw(format!("JOIN {channels}")),
        }
    }

    pub fn part(&mut self, channel: &str, reason: &str) {
        self.raw(format!("PART {channel} :{reason}"));
    }

    pub fn privmsg(&mut self, target: &str, text: &str) {
        self.raw(format!("PRIVMSG {target} :{text}"));
    }

    pub fn notice(&mut self, target: &str, text: &str) {
        self.raw(format!("NOTICE {target} :{text}"));
    }

    /// Change modes on a channel or on the bot itself.
    pub fn mode(&mut self, target: &str, modes: &str) {
        self.raw(format!("MODE {target} {modes}"));
    }

    /// Arm a named timer; `reps == 0` repeats until deleted.
    pub fn timer<F>(&mut self, name: impl Into<String>, delay: Duration, reps: u32, callback: F)
    where
        F: FnMut(&mut Commands) -> anyhow::Result<()> + 'static,
    {
        self.queue.push_back(Action::AddTimer {
            name: name.into(),
            delay,
            reps,
            callback: Box::new(callback),
        });
    }

    /// Cancel the earliest timer with this name.
    pub fn timer_del(&mut self, name: impl Into<String>) {
        self.queue.push_back(Action::DelTimer(name.into()));
    }

    /// Broadcast a signal to every loaded unit.
    pub fn signal<I, S>(&mut self, name: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queue.push_back(Action::Signal {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        });
    }

    /// Load units of a module; all of them when `units` is empty.
    pub fn load(&mut self, module: impl Into<String>, units: &[&str]) {
        self.queue.push_back(Action::Load {
            module: module.into(),
            units: units.iter().map(|u| u.to_string()).collect(),
        });
    }

    /// Unload units of a module; all of them when `units` is empty.
    pub fn unload(&mut self, module: impl Into<String>, units: &[&str]) {
        self.queue.push_back(Action::Unload {
            module: module.into(),
            units: units.iter().map(|u| u.to_string()).collect(),
        });
    }

    /// Unload and load again every loaded unit of a module.
    pub fn reload(&mut self, module: impl Into<String>) {
        self.queue.push_back(Action::Reload {
            module: module.into(),
        });
    }

    /// Shared variables, common to all units and kept across reloads.
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.variables
    }

    /// Command aliases published by units, keyed by alias name.
    ///
    /// Like the variables, the table is shared by every unit and outlives
    /// loads and reloads.
    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.aliases
    }

    pub(crate) fn pop_action(&mut self) -> Option<Action> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// What a handler receives: read-only world access plus [`Commands`].
pub struct Context<'a> {
    world: &'a StateTracker,
    config: &'a Config,
    commands: &'a mut Commands,
}

impl<'a> Context<'a> {
    pub fn new(world: &'a StateTracker, config: &'a Config, commands: &'a mut Commands) -> Self {
        Self {
            world,
            config,
            commands,
        }
    }

    /// The tracked world model.
    pub fn world(&self) -> &'a StateTracker {
        self.world
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Resolve a nick; unknown names yield a detached record.
    pub fn nick(&self, name: &str, host: Option<&str>) -> Cow<'a, Nick> {
        self.world.resolve_nick(name, host)
    }

    /// Resolve a channel; unknown names yield a detached record.
    pub fn channel(&self, name: &str) -> Cow<'a, Channel> {
        self.world.resolve_channel(name)
    }

    pub fn channels(&self) -> Vec<&'a Channel> {
        self.world.channels()
    }

    /// The bot's own nick record.
    pub fn me(&self) -> Cow<'a, Nick> {
        self.world.me_nick()
    }
}

impl Deref for Context<'_> {
    type Target = Commands;

    fn deref(&self) -> &Commands {
        self.commands
    }
}

impl DerefMut for Context<'_> {
    fn deref_mut(&mut self) -> &mut Commands {
        self.commands
    }
}
