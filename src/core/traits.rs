//! Core traits connecting data, training and provenance

use crate::core::{FeatureMap, LabelInfo, Result, Sample};
use crate::model::Model;
use crate::provenance::ObjectProvenance;

/// A source of labelled samples, e.g. a file on disk or one side of a split
pub trait DataSource: Send + Sync {
    /// All samples in source order
    fn samples(&self) -> &[Sample];

    /// Feature names indexed by feature id
    fn feature_names(&self) -> &[String];

    /// Provenance describing where the samples came from
    fn provenance(&self) -> ObjectProvenance;

    /// Number of samples
    fn len(&self) -> usize {
        self.samples().len()
    }

    /// Check if the source is empty
    fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }
}

/// Dataset abstraction for efficient data access
pub trait Dataset: Send + Sync {
    /// All samples in dataset order
    fn samples(&self) -> &[Sample];

    /// Feature domain observed in the samples
    fn feature_map(&self) -> &FeatureMap;

    /// Label domain observed in the samples
    fn label_info(&self) -> &LabelInfo;

    /// Provenance of the dataset, including its source chain
    fn provenance(&self) -> ObjectProvenance;

    /// Number of samples in the dataset
    fn len(&self) -> usize {
        self.samples().len()
    }

    /// Number of features (dimensionality)
    fn dim(&self) -> usize {
        self.feature_map().size()
    }

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample {
        self.samples()[i].clone()
    }

    /// Get all labels as a vector
    fn get_labels(&self) -> Vec<f64> {
        self.samples().iter().map(|s| s.label).collect()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Something that turns a dataset into a model
///
/// Trainers are immutable once built apart from their invocation counter,
/// which advances by one on every call to [`Trainer::train`].
pub trait Trainer: Send + Sync {
    /// Train a model on the dataset
    fn train(&self, dataset: &dyn Dataset) -> Result<Model>;

    /// Number of times `train` has been called, including draws restored at construction
    fn invocation_count(&self) -> u64;

    /// Provenance of the trainer in its current state
    fn provenance(&self) -> ObjectProvenance;
}
