//! Plugin units, modules and the module registry.
//!
//! A *unit* is one independently loadable behavior: a type implementing
//! [`Plugin`]. A *module* groups units under one identifier. The
//! [`ModuleRegistry`] maps identifiers to the latest registered version of
//! each module; loading instantiates units from whatever version is current.

use std::collections::HashMap;

use slirc_proto::Event;
use tracing::info;

use super::context::Context;
use super::handlers::Handlers;
use super::kind::EventKind;
use crate::config::Config;

/// A loadable behavior unit.
///
/// ```ignore
/// struct Greeter;
///
/// impl Plugin for Greeter {
///     fn create(_config: &Config) -> anyhow::Result<Self> {
///         Ok(Greeter)
///     }
///
///     fn register(handlers: &mut Handlers<Self>) {
///         handlers.on("JOIN", Self::on_join);
///     }
/// }
/// ```
pub trait Plugin: Sized + 'static {
    /// Build a fresh instance. Called on every load and reload.
    fn create(config: &Config) -> anyhow::Result<Self>;

    /// Declare the handlers of this unit.
    fn register(handlers: &mut Handlers<Self>);
}

/// A unit instance with its handler table, type-erased.
pub(crate) trait LoadedUnit {
    fn handler_count(&self, kind: &EventKind) -> usize;

    fn call(
        &mut self,
        kind: &EventKind,
        idx: usize,
        ctx: &mut Context<'_>,
        event: &Event,
    ) -> anyhow::Result<()>;
}

struct Instance<P> {
    plugin: P,
    handlers: Handlers<P>,
}

impl<P: Plugin> LoadedUnit for Instance<P> {
    fn handler_count(&self, kind: &EventKind) -> usize {
        self.handlers.count(kind)
    }

    fn call(
        &mut self,
        kind: &EventKind,
        idx: usize,
        ctx: &mut Context<'_>,
        event: &Event,
    ) -> anyhow::Result<()> {
        match self.handlers.get_mut(kind, idx) {
            Some(handler) => handler(&mut self.plugin, ctx, event),
            None => Ok(()),
        }
    }
}

pub(crate) type UnitFactory = fn(&Config) -> anyhow::Result<Box<dyn LoadedUnit>>;

fn instantiate<P: Plugin>(config: &Config) -> anyhow::Result<Box<dyn LoadedUnit>> {
    let plugin = P::create(config)?;
    let mut handlers = Handlers::new();
    P::register(&mut handlers);
    handlers.check()?;
    Ok(Box::new(Instance { plugin, handlers }))
}

/// A named group of units.
pub struct PluginModule {
    id: String,
    units: Vec<(String, UnitFactory)>,
}

impl PluginModule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            units: Vec::new(),
        }
    }

    /// Add a unit under `name`.
    pub fn unit<P: Plugin>(mut self, name: impl Into<String>) -> Self {
        let factory: UnitFactory = instantiate::<P>;
        self.units.push((name.into(), factory));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Unit names in declaration order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn factory(&self, unit: &str) -> Option<UnitFactory> {
        self.units
            .iter()
            .find(|(name, _)| name == unit)
            .map(|(_, factory)| *factory)
    }
}

struct RegistryEntry {
    version: u32,
    module: PluginModule,
}

/// Versioned module registry.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous version. Returns the new
    /// version number. Already loaded units keep running the old version
    /// until they are reloaded.
    pub fn register(&mut self, module: PluginModule) -> u32 {
        let id = module.id().to_string();
        let version = self.entries.get(&id).map_or(1, |e| e.version + 1);
        info!(module = %id, version, "Registered module");
        self.entries.insert(id, RegistryEntry { version, module });
        version
    }

    /// Current module and its version.
    pub fn get(&self, id: &str) -> Option<(&PluginModule, u32)> {
        self.entries.get(id).map(|e| (&e.module, e.version))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
