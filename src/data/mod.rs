//! Data sources and datasets
//!
//! Data sources produce labelled samples and describe where they came from. Datasets wrap a
//! data source, compute its feature and label domains, and record the source's provenance
//! as their `source-provenance`.

pub mod csv;
pub mod dataset;
pub mod libsvm;
pub mod memory;
pub mod split;

pub use self::csv::CSVSource;
pub use self::dataset::{MinimumCardinalityDataset, MutableDataset};
pub use self::libsvm::LibSVMSource;
pub use self::memory::InMemorySource;
pub use self::split::{SplitDataSource, TrainTestSplitter};

/// Map any numeric label onto the binary {-1, +1} domain
pub(crate) fn binarize_label(label: f64) -> f64 {
    if label == 1.0 || label == -1.0 {
        label
    } else if label > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Default name of the feature with the given id
pub(crate) fn default_feature_name(id: usize) -> String {
    format!("feature-{id}")
}
