//! Handler tables.
//!
//! A unit declares its handlers once, in [`Plugin::register`], by mapping
//! event kinds to callbacks. The resulting table is stored next to the
//! unit instance and consulted on every dispatch.
//!
//! [`Plugin::register`]: super::Plugin::register

use std::collections::HashMap;

use regex::Regex;
use slirc_proto::Event;

use super::context::Context;
use super::kind::EventKind;

/// A callback bound to a unit type `P`.
pub type Handler<P> = Box<dyn FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()>>;

/// Event kind to ordered handler list.
pub struct Handlers<P> {
    table: HashMap<EventKind, Vec<Handler<P>>>,
    invalid: Vec<regex::Error>,
}

impl<P> Handlers<P> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            invalid: Vec::new(),
        }
    }

    /// Subscribe `handler` to `kind`. Handlers for one kind run in
    /// registration order.
    pub fn on<F>(&mut self, kind: impl Into<EventKind>, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.table
            .entry(kind.into())
            .or_default()
            .push(Box::new(handler));
        self
    }

    pub fn on_load<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Load, handler)
    }

    pub fn on_unload<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Unload, handler)
    }

    /// Registration confirmed by the server.
    pub fn on_connect<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Connect, handler)
    }

    pub fn on_disconnect<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Disconnect, handler)
    }

    pub fn on_signal<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Signal, handler)
    }

    /// Every dispatched event, before kind-specific handlers.
    pub fn on_raw<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        self.on(EventKind::Raw, handler)
    }

    /// PRIVMSG whose target matches `target` and whose text matches `text`.
    ///
    /// Both patterns must match from the start of their field. They are
    /// compiled here, once; an invalid pattern registers nothing and makes
    /// the unit fail to instantiate.
    pub fn on_text<F>(&mut self, text: &str, target: &str, mut handler: F) -> &mut Self
    where
        F: FnMut(&mut P, &mut Context<'_>, &Event) -> anyhow::Result<()> + 'static,
    {
        let (text, target) = match (anchored(text), anchored(target)) {
            (Ok(text), Ok(target)) => (text, target),
            (Err(e), _) | (_, Err(e)) => {
                self.invalid.push(e);
                return self;
            }
        };
        self.on("PRIVMSG", move |plugin, ctx, event| {
            let (Some(to), Some(message)) = (event.arg(0), event.arg(1)) else {
                return Ok(());
            };
            if target.is_match(to) && text.is_match(message) {
                handler(plugin, ctx, event)
            } else {
                Ok(())
            }
        })
    }

    /// Fails if any pattern given to [`on_text`](Self::on_text) was invalid.
    pub fn check(&self) -> anyhow::Result<()> {
        match self.invalid.first() {
            Some(e) => anyhow::bail!("invalid text pattern: {e}"),
            None => Ok(()),
        }
    }

    /// Number of handlers for `kind`.
    pub fn count(&self, kind: &EventKind) -> usize {
        self.table.get(kind).map_or(0, Vec::len)
    }

    /// Kinds with at least one handler.
    pub fn kinds(&self) -> impl Iterator<Item = &EventKind> {
        self.table.keys()
    }

    pub(crate) fn get_mut(&mut self, kind: &EventKind, idx: usize) -> Option<&mut Handler<P>> {
        self.table.get_mut(kind)?.get_mut(idx)
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

impl<P> Default for Handlers<P> {
    fn default() -> Self {
        Self::new()
    }
}
