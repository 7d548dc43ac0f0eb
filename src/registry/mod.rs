//! Rebuilding live components from extracted configuration
//!
//! A [`Catalog`] maps stable class identifiers to constructors and is shared by every
//! reproduction. A [`ConfigurationManager`] holds the configurations of one provenance tree
//! and instantiates them on demand, resolving references between components by name.

pub mod catalog;
pub mod manager;

pub use self::catalog::{Catalog, Constructor, DatasetRewrapper, DatasetWrapper};
pub use self::manager::ConfigurationManager;

use crate::core::{DataSource, ReproError, Result, Trainer};
use crate::kernel::KernelSpec;
use std::fmt;
use std::sync::Arc;

/// What a catalog entry builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Trainer,
    DataSource,
    Kernel,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Trainer => "trainer",
            ComponentKind::DataSource => "data source",
            ComponentKind::Kernel => "kernel",
        }
    }
}

/// A live component built from configuration
#[derive(Clone)]
pub enum Component {
    Trainer(Arc<dyn Trainer>),
    DataSource(Arc<dyn DataSource>),
    Kernel(KernelSpec),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Trainer(_) => ComponentKind::Trainer,
            Component::DataSource(_) => ComponentKind::DataSource,
            Component::Kernel(_) => ComponentKind::Kernel,
        }
    }

    pub fn as_trainer(&self) -> Option<&Arc<dyn Trainer>> {
        match self {
            Component::Trainer(trainer) => Some(trainer),
            _ => None,
        }
    }

    pub fn as_data_source(&self) -> Option<&Arc<dyn DataSource>> {
        match self {
            Component::DataSource(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_kernel(&self) -> Option<&KernelSpec> {
        match self {
            Component::Kernel(kernel) => Some(kernel),
            _ => None,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Trainer(trainer) => {
                write!(f, "Trainer({})", trainer.provenance().class_name())
            }
            Component::DataSource(source) => {
                write!(f, "DataSource({})", source.provenance().class_name())
            }
            Component::Kernel(kernel) => write!(f, "Kernel({kernel:?})"),
        }
    }
}

/// Resolves references to other components while a component is being built
pub trait ComponentResolver {
    /// Instantiate (or fetch) the component called `name`
    fn resolve(&mut self, name: &str) -> Result<Component>;

    fn resolve_kernel(&mut self, name: &str) -> Result<KernelSpec> {
        match self.resolve(name)? {
            Component::Kernel(kernel) => Ok(kernel),
            other => Err(wrong_kind(name, ComponentKind::Kernel, &other)),
        }
    }

    fn resolve_data_source(&mut self, name: &str) -> Result<Arc<dyn DataSource>> {
        match self.resolve(name)? {
            Component::DataSource(source) => Ok(source),
            other => Err(wrong_kind(name, ComponentKind::DataSource, &other)),
        }
    }

    fn resolve_trainer(&mut self, name: &str) -> Result<Arc<dyn Trainer>> {
        match self.resolve(name)? {
            Component::Trainer(trainer) => Ok(trainer),
            other => Err(wrong_kind(name, ComponentKind::Trainer, &other)),
        }
    }
}

fn wrong_kind(name: &str, expected: ComponentKind, found: &Component) -> ReproError {
    ReproError::reconstruction(
        name,
        format!(
            "expected a {}, found a {}",
            expected.as_str(),
            found.kind().as_str()
        ),
    )
}
