//! SVM training with provenance capture and replay
//!
//! Every trained [`Model`] carries a [`ModelProvenance`] recording the trainer configuration,
//! its RNG invocation count and the data the model was trained on. A [`Reproducer`] rebuilds
//! and retrains that pipeline from the provenance alone, and [`diff_provenance`] reports how
//! two provenance trees differ.

pub mod cache;
pub mod core;
pub mod data;
pub mod evaluation;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod provenance;
pub mod registry;
pub mod repro;
pub mod solver;
pub mod trainer;

// Re-export main types for convenience
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{
    CSVSource, InMemorySource, LibSVMSource, MinimumCardinalityDataset, MutableDataset,
    SplitDataSource, TrainTestSplitter,
};
pub use crate::evaluation::{evaluate, EvaluationMetrics};
pub use crate::kernel::{Kernel, KernelSpec};
pub use crate::model::Model;
pub use crate::persistence::{load_model, save_model};
pub use crate::provenance::{diff_provenance, ModelProvenance, ObjectProvenance};
pub use crate::registry::{Catalog, ConfigurationManager};
pub use crate::repro::{ReproState, Reproducer};
pub use crate::trainer::SvmTrainer;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
