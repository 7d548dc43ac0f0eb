//! In-memory data source

use crate::core::{DataSource, Sample};
use crate::provenance::{ObjectKind, ObjectProvenance};

/// Samples held in memory
///
/// The provenance records only what the data looked like, so a model trained on it
/// cannot be reproduced.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    feature_names: Vec<String>,
    samples: Vec<Sample>,
    description: String,
}

impl InMemorySource {
    pub const CLASS_NAME: &'static str = "InMemorySource";

    pub fn new(feature_names: Vec<String>, samples: Vec<Sample>) -> Self {
        Self {
            feature_names,
            samples,
            description: String::new(),
        }
    }

    /// Attach a free-form description to the provenance
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl DataSource for InMemorySource {
    fn samples(&self) -> &[Sample] {
        &self.samples
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::non_configurable(ObjectKind::DataSource, Self::CLASS_NAME)
            .with_instance("description", self.description.as_str())
            .with_instance("num-examples", self.samples.len() as i64)
    }
}
