//! Class identifier to constructor mapping

use super::{Component, ComponentKind, ComponentResolver};
use crate::core::{DataSource, Dataset, ReproError, Result};
use crate::data::{CSVSource, LibSVMSource, MinimumCardinalityDataset, MutableDataset};
use crate::kernel::{KernelSpec, LinearKernel, PolynomialKernel, RBFKernel};
use crate::provenance::{ComponentConfig, ObjectProvenance};
use crate::trainer::SvmTrainer;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a component from its configuration, resolving references through the resolver
pub type Constructor =
    dyn Fn(&ComponentConfig, &mut dyn ComponentResolver) -> Result<Component> + Send + Sync;

/// Builds a dataset of a given class over a recovered data source
pub type DatasetWrapper = dyn Fn(Arc<dyn DataSource>) -> Result<Arc<dyn Dataset>> + Send + Sync;

/// Rebuilds an outer dataset over a rebuilt inner one, from the outer dataset's recorded provenance
pub type DatasetRewrapper =
    dyn Fn(Arc<dyn Dataset>, &ObjectProvenance) -> Result<Arc<dyn Dataset>> + Send + Sync;

struct Entry {
    kind: ComponentKind,
    constructor: Box<Constructor>,
}

/// Registry of constructible classes
///
/// Populated once, then shared read-only between reproductions.
#[derive(Default)]
pub struct Catalog {
    components: HashMap<String, Entry>,
    datasets: HashMap<String, Box<DatasetWrapper>>,
    rewrappers: HashMap<String, Box<DatasetRewrapper>>,
}

impl Catalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding every built-in trainer, kernel, data source and dataset
    pub fn standard() -> Self {
        let mut catalog = Self::new();

        catalog.register(SvmTrainer::CLASS_NAME, ComponentKind::Trainer, |config, resolver| {
            let trainer = SvmTrainer::from_config(config, resolver)?;
            Ok(Component::Trainer(Arc::new(trainer)))
        });
        for class in [
            LinearKernel::CLASS_NAME,
            RBFKernel::CLASS_NAME,
            PolynomialKernel::CLASS_NAME,
        ] {
            catalog.register(class, ComponentKind::Kernel, |config, _| {
                KernelSpec::from_config(config).map(Component::Kernel)
            });
        }
        catalog.register(CSVSource::CLASS_NAME, ComponentKind::DataSource, |config, _| {
            let source = CSVSource::from_config(config)?;
            Ok(Component::DataSource(Arc::new(source)))
        });
        catalog.register(LibSVMSource::CLASS_NAME, ComponentKind::DataSource, |config, _| {
            let source = LibSVMSource::from_config(config)?;
            Ok(Component::DataSource(Arc::new(source)))
        });
        catalog.register_dataset(MutableDataset::CLASS_NAME, |source| {
            let dataset = MutableDataset::from_source(source.as_ref())?;
            Ok(Arc::new(dataset) as Arc<dyn Dataset>)
        });
        catalog.register_rewrapper(
            MinimumCardinalityDataset::CLASS_NAME,
            MinimumCardinalityDataset::replay,
        );

        catalog
    }

    /// Register (or replace) the constructor for `class_name`
    pub fn register<F>(
        &mut self,
        class_name: impl Into<String>,
        kind: ComponentKind,
        constructor: F,
    ) where
        F: Fn(&ComponentConfig, &mut dyn ComponentResolver) -> Result<Component>
            + Send
            + Sync
            + 'static,
    {
        self.components.insert(
            class_name.into(),
            Entry {
                kind,
                constructor: Box::new(constructor),
            },
        );
    }

    /// Register (or replace) the dataset wrapper for `class_name`
    pub fn register_dataset<F>(&mut self, class_name: impl Into<String>, wrapper: F)
    where
        F: Fn(Arc<dyn DataSource>) -> Result<Arc<dyn Dataset>> + Send + Sync + 'static,
    {
        self.datasets.insert(class_name.into(), Box::new(wrapper));
    }

    /// Register (or replace) the rewrapper for datasets of class `class_name` over other datasets
    pub fn register_rewrapper<F>(&mut self, class_name: impl Into<String>, rewrapper: F)
    where
        F: Fn(Arc<dyn Dataset>, &ObjectProvenance) -> Result<Arc<dyn Dataset>>
            + Send
            + Sync
            + 'static,
    {
        self.rewrappers.insert(class_name.into(), Box::new(rewrapper));
    }

    /// Kind of component built for `class_name`, if registered
    pub fn kind_of(&self, class_name: &str) -> Option<ComponentKind> {
        self.components.get(class_name).map(|entry| entry.kind)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.components.contains_key(class_name)
    }

    pub fn has_dataset(&self, class_name: &str) -> bool {
        self.datasets.contains_key(class_name)
    }

    pub fn has_rewrapper(&self, class_name: &str) -> bool {
        self.rewrappers.contains_key(class_name)
    }

    /// Build the component described by `config`
    ///
    /// Failures are reported against the component being built; failures of referenced
    /// components keep naming the component that failed.
    pub fn construct(
        &self,
        config: &ComponentConfig,
        resolver: &mut dyn ComponentResolver,
    ) -> Result<Component> {
        let entry = self.components.get(config.class_name()).ok_or_else(|| {
            ReproError::reconstruction(
                config.name(),
                format!("unknown class '{}'", config.class_name()),
            )
        })?;

        let component = (entry.constructor)(config, resolver).map_err(|e| match e {
            ReproError::Reconstruction { .. } => e,
            other => ReproError::reconstruction(config.name(), other.to_string()),
        })?;

        if component.kind() != entry.kind {
            return Err(ReproError::reconstruction(
                config.name(),
                format!(
                    "class '{}' is registered as a {} but built a {}",
                    config.class_name(),
                    entry.kind.as_str(),
                    component.kind().as_str()
                ),
            ));
        }
        Ok(component)
    }

    /// Wrap a data source into a dataset of class `class_name`
    pub fn wrap_dataset(
        &self,
        class_name: &str,
        source: Arc<dyn DataSource>,
    ) -> Result<Arc<dyn Dataset>> {
        let wrapper = self.datasets.get(class_name).ok_or_else(|| {
            ReproError::DatasetRecovery(format!("no dataset wrapper registered for '{class_name}'"))
        })?;
        wrapper(source)
    }

    /// Rebuild the dataset recorded as `recorded` over the already rebuilt `inner`
    pub fn rewrap_dataset(
        &self,
        recorded: &ObjectProvenance,
        inner: Arc<dyn Dataset>,
    ) -> Result<Arc<dyn Dataset>> {
        let rewrapper = self.rewrappers.get(recorded.class_name()).ok_or_else(|| {
            ReproError::DatasetRecovery(format!(
                "no dataset rewrapper registered for '{}'",
                recorded.class_name()
            ))
        })?;
        rewrapper(inner, recorded)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components: Vec<&str> = self.components.keys().map(String::as_str).collect();
        components.sort_unstable();
        let mut datasets: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        datasets.sort_unstable();
        let mut rewrappers: Vec<&str> = self.rewrappers.keys().map(String::as_str).collect();
        rewrappers.sort_unstable();
        f.debug_struct("Catalog")
            .field("components", &components)
            .field("datasets", &datasets)
            .field("rewrappers", &rewrappers)
            .finish()
    }
}
