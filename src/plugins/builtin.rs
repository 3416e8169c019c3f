//! Built-in modules.

use std::time::Duration;

use slirc_proto::Event;
use tracing::debug;

use super::context::Context;
use super::handlers::Handlers;
use super::module::{ModuleRegistry, Plugin, PluginModule};
use crate::config::Config;

/// Module identifier of [`AutoJoin`].
pub const AUTOJOIN: &str = "autojoin";

const REJOIN_TIMER: &str = "autojoin-rejoin";
const REJOIN_INTERVAL: Duration = Duration::from_secs(60);

/// Register every built-in module.
pub fn register_builtins(registry: &mut ModuleRegistry) {
    registry.register(PluginModule::new(AUTOJOIN).unit::<AutoJoin>("AutoJoin"));
}

/// Joins the configured channels once registered, and periodically
/// rejoins any it is not in (after a kick, say).
pub struct AutoJoin {
    channels: Vec<String>,
    timer_armed: bool,
}

impl Plugin for AutoJoin {
    fn create(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            channels: config.plugins.autojoin.clone(),
            timer_armed: false,
        })
    }

    fn register(handlers: &mut Handlers<Self>) {
        handlers
            .on_connect(Self::on_connect)
            .on_signal(Self::on_signal)
            .on_disconnect(Self::on_disconnect)
            .on_unload(Self::on_disconnect);
    }
}

impl AutoJoin {
    fn on_connect(&mut self, ctx: &mut Context<'_>, _event: &Event) -> anyhow::Result<()> {
        if self.channels.is_empty() {
            return Ok(());
        }
        ctx.join(&self.channels.join(","), None);

        if !self.timer_armed {
            ctx.timer(REJOIN_TIMER, REJOIN_INTERVAL, 0, |cmds| {
                cmds.signal(AUTOJOIN, Vec::<String>::new());
                Ok(())
            });
            self.timer_armed = true;
        }
        Ok(())
    }

    fn on_signal(&mut self, ctx: &mut Context<'_>, event: &Event) -> anyhow::Result<()> {
        if event.nick() != AUTOJOIN {
            return Ok(());
        }
        let world = ctx.world();
        let missing: Vec<&str> = self
            .channels
            .iter()
            .map(String::as_str)
            .filter(|c| world.channel(c).is_none())
            .collect();
        if !missing.is_empty() {
            debug!(channels = ?missing, "Rejoining channels");
            ctx.join(&missing.join(","), None);
        }
        Ok(())
    }

    fn on_disconnect(&mut self, ctx: &mut Context<'_>, _event: &Event) -> anyhow::Result<()> {
        if self.timer_armed {
            ctx.timer_del(REJOIN_TIMER);
            self.timer_armed = false;
        }
        Ok(())
    }
}
