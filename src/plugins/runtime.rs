//! The Plugin Runtime - load/unload/reload and event dispatch.
//!
//! Loaded units are kept in load order, grouped by module. Dispatch runs
//! every raw handler first, then every handler for the event's own kind.
//! Each handler call is isolated: an error or a panic is logged with the
//! owning module and unit, and the remaining handlers still run.
//!
//! Module operations never fail outward. Their outcome is a
//! [`LoadReport`] or [`UnloadReport`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use slirc_proto::Event;
use tracing::{debug, info, warn};

use super::context::{Commands, Context};
use super::kind::{EventKind, LOAD, SIGNAL, UNLOAD};
use super::module::{LoadedUnit, ModuleRegistry};
use crate::config::Config;
use crate::error::PluginError;
use crate::state::StateTracker;

/// Outcome of a load or reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub module: String,
    /// Registry version the units were instantiated from.
    pub version: Option<u32>,
    /// Units now loaded, in load order.
    pub loaded: Vec<String>,
    pub errors: Vec<PluginError>,
}

impl LoadReport {
    fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of an unload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnloadReport {
    pub module: String,
    pub unloaded: Vec<String>,
    pub errors: Vec<PluginError>,
}

impl UnloadReport {
    fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

struct UnitSlot {
    name: String,
    unit: Box<dyn LoadedUnit>,
}

struct ModuleSlot {
    id: String,
    version: u32,
    units: Vec<UnitSlot>,
}

/// Loaded plugin units and the shared command queue.
pub struct PluginRuntime {
    config: Arc<Config>,
    registry: ModuleRegistry,
    loaded: Vec<ModuleSlot>,
    commands: Commands,
}

impl PluginRuntime {
    pub fn new(config: Arc<Config>, registry: ModuleRegistry) -> Self {
        Self {
            config,
            registry,
            loaded: Vec::new(),
            commands: Commands::new(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Register new module versions; see [`ModuleRegistry::register`].
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut Commands {
        &mut self.commands
    }

    /// Identifiers of modules with at least one loaded unit, in load order.
    pub fn loaded_modules(&self) -> Vec<&str> {
        self.loaded.iter().map(|m| m.id.as_str()).collect()
    }

    /// Loaded unit names of a module, in load order.
    pub fn loaded_units(&self, module: &str) -> Vec<&str> {
        self.loaded
            .iter()
            .find(|m| m.id == module)
            .map(|m| m.units.iter().map(|u| u.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Registry version a loaded module was instantiated from.
    pub fn loaded_version(&self, module: &str) -> Option<u32> {
        self.loaded.iter().find(|m| m.id == module).map(|m| m.version)
    }

    /// Load units of `module`; all of its units when `units` is empty.
    ///
    /// A unit that is already loaded is unloaded first (its unload
    /// handlers run) and replaced in place.
    pub fn load(&mut self, world: &StateTracker, module: &str, units: &[String]) -> LoadReport {
        let mut report = LoadReport::new(module);

        let Some((registered, version)) = self.registry.get(module) else {
            warn!(module = %module, "Could not load unknown module");
            report.errors.push(PluginError::UnknownModule(module.to_string()));
            return report;
        };
        report.version = Some(version);

        let selected: Vec<(String, _)> = if units.is_empty() {
            registered
                .unit_names()
                .map(|name| (name.to_string(), registered.factory(name)))
                .collect()
        } else {
            units
                .iter()
                .map(|name| (name.clone(), registered.factory(name)))
                .collect()
        };

        for (name, factory) in selected {
            let Some(factory) = factory else {
                warn!(module = %module, unit = %name, "Could not load unit");
                report.errors.push(PluginError::UnknownUnit {
                    module: module.to_string(),
                    unit: name,
                });
                continue;
            };

            let previous_idx = self.teardown_unit(world, module, &name, &mut report.errors);

            let config = Arc::clone(&self.config);
            let unit = match catch_unwind(AssertUnwindSafe(|| factory(&config))) {
                Ok(Ok(unit)) => unit,
                Ok(Err(e)) => {
                    let reason = format!("{e:#}");
                    warn!(module = %module, unit = %name, error = %reason, "Could not instantiate unit");
                    report.errors.push(PluginError::Instantiate {
                        module: module.to_string(),
                        unit: name,
                        reason,
                    });
                    continue;
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    warn!(module = %module, unit = %name, error = %reason, "Unit panicked while instantiating");
                    report.errors.push(PluginError::Instantiate {
                        module: module.to_string(),
                        unit: name,
                        reason,
                    });
                    continue;
                }
            };

            let module_idx = match self.loaded.iter().position(|m| m.id == module) {
                Some(idx) => idx,
                None => {
                    self.loaded.push(ModuleSlot {
                        id: module.to_string(),
                        version,
                        units: Vec::new(),
                    });
                    self.loaded.len() - 1
                }
            };
            let slot = &mut self.loaded[module_idx];
            slot.version = version;
            let unit_idx = previous_idx.unwrap_or(slot.units.len()).min(slot.units.len());
            slot.units.insert(
                unit_idx,
                UnitSlot {
                    name: name.clone(),
                    unit,
                },
            );

            self.run_hook(world, module_idx, unit_idx, &EventKind::Load, &mut report.errors);
            info!(module = %module, unit = %name, version, "Loaded module");
            report.loaded.push(name);
        }

        self.loaded.retain(|m| !m.units.is_empty());
        report
    }

    /// Unload units of `module`; all loaded units when `units` is empty.
    pub fn unload(&mut self, world: &StateTracker, module: &str, units: &[String]) -> UnloadReport {
        let mut report = UnloadReport::new(module);

        if !self.loaded.iter().any(|m| m.id == module) {
            warn!(module = %module, "No loaded module");
            report.errors.push(PluginError::NotLoaded(module.to_string()));
            return report;
        }

        let names: Vec<String> = if units.is_empty() {
            self.loaded_units(module).into_iter().map(String::from).collect()
        } else {
            units.to_vec()
        };

        for name in names {
            if self
                .teardown_unit(world, module, &name, &mut report.errors)
                .is_some()
            {
                report.unloaded.push(name);
            } else {
                warn!(module = %module, unit = %name, "Unit not loaded");
                report.errors.push(PluginError::UnitNotLoaded {
                    module: module.to_string(),
                    unit: name,
                });
            }
        }

        self.loaded.retain(|m| !m.units.is_empty());
        report
    }

    /// Unload every loaded unit of `module`, then load the same units from
    /// the current registry version. A module that is not loaded is loaded
    /// in full.
    pub fn reload(&mut self, world: &StateTracker, module: &str) -> LoadReport {
        let names: Vec<String> = self
            .loaded_units(module)
            .into_iter()
            .map(String::from)
            .collect();

        let mut errors = Vec::new();
        for name in &names {
            self.teardown_unit(world, module, name, &mut errors);
        }

        let mut report = self.load(world, module, &names);
        errors.append(&mut report.errors);
        report.errors = errors;
        report
    }

    /// Dispatch one event: raw handlers first, then handlers for its kind.
    ///
    /// Returns the number of handlers that failed.
    pub fn dispatch(&mut self, world: &StateTracker, event: &Event) -> usize {
        let kind = EventKind::command(&event.command);
        let Self {
            config,
            loaded,
            commands,
            ..
        } = self;
        let mut ctx = Context::new(world, config.as_ref(), commands);

        let raw = EventKind::Raw;
        let passes = if kind == raw {
            vec![&raw]
        } else {
            vec![&raw, &kind]
        };

        let mut failures = 0;
        for pass in passes {
            for module in loaded.iter_mut() {
                for slot in module.units.iter_mut() {
                    failures += run_handlers(&module.id, slot, pass, &mut ctx, event).len();
                }
            }
        }
        failures
    }

    /// Broadcast a signal to every unit as a `_SIGNAL` event from `name!`.
    pub fn signal(&mut self, world: &StateTracker, name: &str, args: Vec<String>) -> usize {
        debug!(signal = %name, "Dispatching signal");
        let event = Event {
            prefix: format!("{name}!"),
            command: SIGNAL.to_string(),
            args,
        };
        self.dispatch(world, &event)
    }

    /// Run unload handlers of one unit and remove it. Returns its former
    /// position within the module, or `None` if it was not loaded.
    fn teardown_unit(
        &mut self,
        world: &StateTracker,
        module: &str,
        unit: &str,
        errors: &mut Vec<PluginError>,
    ) -> Option<usize> {
        let module_idx = self.loaded.iter().position(|m| m.id == module)?;
        let unit_idx = self.loaded[module_idx]
            .units
            .iter()
            .position(|u| u.name == unit)?;

        self.run_hook(world, module_idx, unit_idx, &EventKind::Unload, errors);
        self.loaded[module_idx].units.remove(unit_idx);
        info!(module = %module, unit = %unit, "Unloaded module");
        Some(unit_idx)
    }

    fn run_hook(
        &mut self,
        world: &StateTracker,
        module_idx: usize,
        unit_idx: usize,
        kind: &EventKind,
        errors: &mut Vec<PluginError>,
    ) {
        let Self {
            config,
            loaded,
            commands,
            ..
        } = self;
        let module = &mut loaded[module_idx];
        let slot = &mut module.units[unit_idx];
        let mut ctx = Context::new(world, config.as_ref(), commands);
        let (hook, command) = match kind {
            EventKind::Load => ("load", LOAD),
            _ => ("unload", UNLOAD),
        };
        let event = Event::synthetic(command);

        for reason in run_handlers(&module.id, slot, kind, &mut ctx, &event) {
            errors.push(PluginError::Hook {
                module: module.id.clone(),
                unit: slot.name.clone(),
                hook,
                reason,
            });
        }
    }
}

/// Call every handler of `kind` on one unit, isolating each call.
/// Returns the failure descriptions.
fn run_handlers(
    module: &str,
    slot: &mut UnitSlot,
    kind: &EventKind,
    ctx: &mut Context<'_>,
    event: &Event,
) -> Vec<String> {
    let mut failures = Vec::new();
    for idx in 0..slot.unit.handler_count(kind) {
        let outcome = catch_unwind(AssertUnwindSafe(|| slot.unit.call(kind, idx, ctx, event)));
        let reason = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };
        warn!(
            module = %module,
            unit = %slot.name,
            kind = %kind,
            command = %event.command,
            error = %reason,
            "Could not process handler"
        );
        failures.push(reason);
    }
    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
