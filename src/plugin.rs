/// Explicit plugin registry.
///
/// Plugins are compiled in and registered by name; the configuration only
/// selects which registered plugins contribute tasks to a run.
use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::task::{Task, TaskCatalog};

/// Package installation and system upgrades.
pub mod packages;

/// Service start, stop and status.
pub mod services;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Tasks this plugin adds to the catalog.
    fn tasks(&self) -> Vec<Box<dyn Task>>;
}

pub type PluginFactory = fn() -> Box<dyn Plugin>;

#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<&'static str, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every plugin shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert("packages", packages::factory);
        registry.factories.insert("services", services::factory);
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: PluginFactory) -> Result<()> {
        if self.factories.contains_key(name) {
            return Err(anyhow!("Plugin '{}' is already registered", name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Add the tasks of every plugin in `names` to `catalog`, in order.
    /// Naming a plugin twice activates it once.
    pub fn activate<S: AsRef<str>>(
        &self,
        names: &[S],
        catalog: &mut TaskCatalog,
    ) -> Result<Vec<&'static str>> {
        let mut activated: Vec<&'static str> = Vec::new();

        for name in names {
            let name = name.as_ref();
            let (&registered, factory) = self.factories.get_key_value(name).ok_or_else(|| {
                anyhow!(
                    "Unknown plugin '{}' (available: {})",
                    name,
                    self.names().collect::<Vec<_>>().join(", ")
                )
            })?;

            if activated.contains(&registered) {
                continue;
            }

            let plugin = factory();
            for task in plugin.tasks() {
                catalog.register(task).map_err(|e| {
                    anyhow!("Plugin '{}' cannot be loaded: {}", plugin.name(), e)
                })?;
            }

            log::debug!("Loaded plugin '{}'", registered);
            activated.push(registered);
        }

        Ok(activated)
    }
}
