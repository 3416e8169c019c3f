//! Event pipeline.
//!
//! The [`Engine`] owns the world model, the plugin runtime and the timer
//! scheduler, and runs every event through them in a fixed order: state
//! update, plugin dispatch, then the actions the plugins queued. Actions
//! are applied first-in first-out, so commands reach the sender in the
//! order they were issued and a signal is delivered after the handler
//! that raised it has returned.

use std::sync::Arc;

use slirc_proto::Event;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::plugins::{
    Action, Commands, DISCONNECT, LoadReport, ModuleRegistry, PluginRuntime, UnloadReport,
};
use crate::state::StateTracker;
use crate::timers::TimerScheduler;

/// Destination for outgoing commands.
pub trait CommandSink {
    fn send(&mut self, command: &str);
}

impl CommandSink for Vec<String> {
    fn send(&mut self, command: &str) {
        self.push(command.to_string());
    }
}

/// World model, plugins and timers for one bot.
pub struct Engine {
    tracker: StateTracker,
    plugins: PluginRuntime,
    timers: TimerScheduler<Commands>,
}

impl Engine {
    pub fn new(config: Arc<Config>, registry: ModuleRegistry) -> Self {
        Self {
            tracker: StateTracker::new(),
            plugins: PluginRuntime::new(config, registry),
            timers: TimerScheduler::new(),
        }
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn plugins(&self) -> &PluginRuntime {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRuntime {
        &mut self.plugins
    }

    pub fn timers(&self) -> &TimerScheduler<Commands> {
        &self.timers
    }

    /// Load each module in order, all units.
    pub fn load_modules(&mut self, modules: &[String], out: &mut dyn CommandSink) -> Vec<LoadReport> {
        modules
            .iter()
            .map(|module| self.load(module, &[], out))
            .collect()
    }

    /// Run one inbound event through the tracker and the plugins.
    pub fn handle_event(&mut self, event: &Event, out: &mut dyn CommandSink) {
        self.tracker.update(event);
        self.plugins.dispatch(&self.tracker, event);
        self.apply_actions(out);
    }

    /// Dispatch the synthetic disconnect event.
    pub fn handle_disconnect(&mut self, out: &mut dyn CommandSink) {
        self.handle_event(&Event::synthetic(DISCONNECT), out);
    }

    /// Fire due timers and apply what they queued. Returns the next deadline.
    pub fn process_timers(&mut self, now: Instant, out: &mut dyn CommandSink) -> Option<Instant> {
        self.timers.process(now, self.plugins.commands_mut());
        self.apply_actions(out);
        self.timers.next_deadline()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn load(&mut self, module: &str, units: &[String], out: &mut dyn CommandSink) -> LoadReport {
        let report = self.plugins.load(&self.tracker, module, units);
        log_load(&report);
        self.apply_actions(out);
        report
    }

    pub fn unload(
        &mut self,
        module: &str,
        units: &[String],
        out: &mut dyn CommandSink,
    ) -> UnloadReport {
        let report = self.plugins.unload(&self.tracker, module, units);
        log_unload(&report);
        self.apply_actions(out);
        report
    }

    pub fn reload(&mut self, module: &str, out: &mut dyn CommandSink) -> LoadReport {
        let report = self.plugins.reload(&self.tracker, module);
        log_load(&report);
        self.apply_actions(out);
        report
    }

    /// Broadcast a signal to every unit.
    pub fn signal(&mut self, name: &str, args: Vec<String>, out: &mut dyn CommandSink) {
        self.plugins.signal(&self.tracker, name, args);
        self.apply_actions(out);
    }

    fn apply_actions(&mut self, out: &mut dyn CommandSink) {
        while let Some(action) = self.plugins.commands_mut().pop_action() {
            match action {
                Action::Send(command) => out.send(&command),
                Action::AddTimer {
                    name,
                    delay,
                    reps,
                    callback,
                } => self.timers.add(name, delay, reps, callback),
                Action::DelTimer(name) => {
                    // Already logged by the scheduler.
                    let _ = self.timers.delete(&name);
                }
                Action::Signal { name, args } => {
                    self.plugins.signal(&self.tracker, &name, args);
                }
                Action::Load { module, units } => {
                    log_load(&self.plugins.load(&self.tracker, &module, &units));
                }
                Action::Unload { module, units } => {
                    log_unload(&self.plugins.unload(&self.tracker, &module, &units));
                }
                Action::Reload { module } => {
                    log_load(&self.plugins.reload(&self.tracker, &module));
                }
            }
        }
    }
}

fn log_load(report: &LoadReport) {
    if report.is_ok() {
        info!(module = %report.module, units = ?report.loaded, "Module load finished");
    } else {
        for error in &report.errors {
            warn!(module = %report.module, code = error.error_code(), error = %error, "Module load problem");
        }
    }
}

fn log_unload(report: &UnloadReport) {
    if report.is_ok() {
        info!(module = %report.module, units = ?report.unloaded, "Module unload finished");
    } else {
        for error in &report.errors {
            warn!(module = %report.module, code = error.error_code(), error = %error, "Module unload problem");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{Context, Handlers, Plugin, PluginModule};
    use std::time::Duration;

    /// Echoes `!cmd` lines and exercises every queued action type.
    struct Echo;

    impl Plugin for Echo {
        fn create(_config: &Config) -> anyhow::Result<Self> {
            Ok(Echo)
        }

        fn register(handlers: &mut Handlers<Self>) {
            handlers
                .on("PRIVMSG", Self::on_privmsg)
                .on_signal(|_, ctx, e| {
                    ctx.raw(format!("SIGNAL {} {}", e.nick(), e.args.join(",")));
                    Ok(())
                });
        }
    }

    impl Echo {
        fn on_privmsg(&mut self, ctx: &mut Context<'_>, e: &Event) -> anyhow::Result<()> {
            let target = e.arg(0).unwrap_or_default();
            match e.arg(1).unwrap_or_default() {
                "!signal" => {
                    ctx.signal("echo", ["a", "b"]);
                    ctx.raw("AFTER");
                }
                "!timer" => ctx.timer("tick", Duration::from_secs(5), 2, |cmds| {
                    cmds.raw("TICK");
                    Ok(())
                }),
                "!stop" => ctx.timer_del("tick"),
                "!members" => {
                    let count = ctx.channel(target).members.len();
                    ctx.privmsg(target, &count.to_string());
                }
                "!unload" => ctx.unload("echo", &[]),
                _ => {}
            }
            Ok(())
        }
    }

    fn engine() -> (Engine, Vec<String>) {
        let mut registry = ModuleRegistry::new();
        registry.register(PluginModule::new("echo").unit::<Echo>("Echo"));
        let mut engine = Engine::new(Arc::new(Config::new("localhost", 6667, "bot")), registry);
        let mut out = Vec::new();
        assert!(engine.load_modules(&["echo".to_string()], &mut out)[0].is_ok());
        (engine, out)
    }

    fn say(engine: &mut Engine, text: &str, out: &mut Vec<String>) {
        let event = Event::new("alice!a@h", "PRIVMSG", ["#c", text]);
        engine.handle_event(&event, out);
    }

    #[test]
    fn test_state_is_updated_before_dispatch() {
        let (mut engine, mut out) = engine();
        for line in [":srv 001 bot :hi", ":bot!b@h JOIN #c", ":alice!a@h JOIN #c"] {
            engine.handle_event(&Event::parse(line).unwrap(), &mut out);
        }
        say(&mut engine, "!members", &mut out);
        assert_eq!(out, vec!["PRIVMSG #c :2"]);
    }

    #[test]
    fn test_signal_runs_after_current_handler() {
        let (mut engine, mut out) = engine();
        say(&mut engine, "!signal", &mut out);
        assert_eq!(out, vec!["AFTER", "SIGNAL echo a,b"]);
    }

    #[test]
    fn test_timers_from_handlers() {
        let (mut engine, mut out) = engine();
        say(&mut engine, "!timer", &mut out);
        let deadline = engine.next_deadline().unwrap();

        let next = engine.process_timers(deadline, &mut out);
        assert_eq!(out, vec!["TICK"]);
        assert_eq!(next, Some(deadline + Duration::from_secs(5)));

        say(&mut engine, "!stop", &mut out);
        assert!(engine.timers().is_empty());
    }

    #[test]
    fn test_timers_survive_disconnect() {
        let (mut engine, mut out) = engine();
        say(&mut engine, "!timer", &mut out);
        engine.handle_disconnect(&mut out);
        assert!(engine.timers().contains("tick"));
    }

    #[test]
    fn test_handler_can_unload_its_own_module() {
        let (mut engine, mut out) = engine();
        say(&mut engine, "!unload", &mut out);
        assert!(engine.plugins().loaded_modules().is_empty());

        say(&mut engine, "!signal", &mut out);
        assert!(out.is_empty());
    }
}
