//! Per-reproduction configuration registry

use super::{Catalog, Component, ComponentKind, ComponentResolver};
use crate::core::{ReproError, Result};
use crate::provenance::{ComponentConfig, Property};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Named component configurations and the instances built from them
///
/// Instances are created on first lookup and cached for the lifetime of the manager.
pub struct ConfigurationManager {
    catalog: Arc<Catalog>,
    configs: Vec<ComponentConfig>,
    index: HashMap<String, usize>,
    instances: HashMap<String, Component>,
    /// Names currently being built, innermost last
    resolving: Vec<String>,
}

impl ConfigurationManager {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            configs: Vec::new(),
            index: HashMap::new(),
            instances: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Register configurations; names must be unique across the manager
    pub fn add_configurations(
        &mut self,
        configs: impl IntoIterator<Item = ComponentConfig>,
    ) -> Result<()> {
        for config in configs {
            if self.index.contains_key(config.name()) {
                return Err(ReproError::reconstruction(
                    config.name(),
                    "a configuration with this name is already registered",
                ));
            }
            self.index.insert(config.name().to_string(), self.configs.len());
            self.configs.push(config);
        }
        Ok(())
    }

    /// Configuration registered under `name`
    pub fn config(&self, name: &str) -> Option<&ComponentConfig> {
        self.index.get(name).map(|&i| &self.configs[i])
    }

    /// All configurations in registration order
    pub fn configs(&self) -> &[ComponentConfig] {
        &self.configs
    }

    /// Override one property of a registered configuration
    ///
    /// Cached instances are dropped, since any of them may have been built from the old value.
    pub fn set_property(&mut self, name: &str, key: &str, value: Property) -> Result<()> {
        let &position = self.index.get(name).ok_or_else(|| {
            ReproError::reconstruction(name, "no configuration registered under this name")
        })?;
        debug!("Overriding {name}.{key} with {value:?}");
        self.configs[position].set_property(key, value);
        self.instances.clear();
        Ok(())
    }

    /// The component called `name`, built on first use
    pub fn lookup(&mut self, name: &str) -> Result<Component> {
        if let Some(component) = self.instances.get(name) {
            return Ok(component.clone());
        }
        let &position = self.index.get(name).ok_or_else(|| {
            ReproError::reconstruction(name, "no configuration registered under this name")
        })?;
        if self.resolving.iter().any(|n| n == name) {
            let chain = self.resolving.join(" -> ");
            return Err(ReproError::reconstruction(
                name,
                format!("reference cycle: {chain} -> {name}"),
            ));
        }

        let config = self.configs[position].clone();
        let catalog = Arc::clone(&self.catalog);
        self.resolving.push(name.to_string());
        let built = catalog.construct(&config, self);
        self.resolving.pop();
        let component = built?;

        debug!("Instantiated {} '{}'", config.class_name(), name);
        self.instances.insert(name.to_string(), component.clone());
        Ok(component)
    }

    /// Every component of class `class_name`, in registration order
    pub fn list_all(&mut self, class_name: &str) -> Result<Vec<(String, Component)>> {
        let names: Vec<String> = self
            .configs
            .iter()
            .filter(|config| config.class_name() == class_name)
            .map(|config| config.name().to_string())
            .collect();
        self.lookup_all(names)
    }

    /// Every component whose class builds a `kind`, in registration order
    pub fn list_all_of_kind(&mut self, kind: ComponentKind) -> Result<Vec<(String, Component)>> {
        let names: Vec<String> = self
            .configs
            .iter()
            .filter(|config| self.catalog.kind_of(config.class_name()) == Some(kind))
            .map(|config| config.name().to_string())
            .collect();
        self.lookup_all(names)
    }

    fn lookup_all(&mut self, names: Vec<String>) -> Result<Vec<(String, Component)>> {
        names
            .into_iter()
            .map(|name| {
                let component = self.lookup(&name)?;
                Ok((name, component))
            })
            .collect()
    }
}

impl ComponentResolver for ConfigurationManager {
    fn resolve(&mut self, name: &str) -> Result<Component> {
        self.lookup(name)
    }
}
