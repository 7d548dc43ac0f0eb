//! Seeded train/test splits of a data source

use crate::core::{DataSource, ReproError, Result, Sample};
use crate::provenance::{
    ObjectKind, ObjectProvenance, SPLIT_IS_TRAIN, SPLIT_SEED, SPLIT_SOURCE, SPLIT_TRAIN_PROPORTION,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Splits a data source into a training and a test partition
///
/// Sample order is shuffled with an RNG seeded by `seed`; the first
/// `floor(len * train_proportion)` shuffled samples form the training partition.
pub struct TrainTestSplitter {
    source: Arc<dyn DataSource>,
    train_proportion: f64,
    seed: u64,
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
}

impl TrainTestSplitter {
    pub const CLASS_NAME: &'static str = "TrainTestSplitter";

    /// Create a split; the proportion must lie strictly between 0 and 1
    pub fn new(source: Arc<dyn DataSource>, train_proportion: f64, seed: u64) -> Result<Self> {
        if !(train_proportion > 0.0 && train_proportion < 1.0) {
            return Err(ReproError::InvalidParameter(format!(
                "Train proportion must be between 0 and 1, got: {train_proportion}"
            )));
        }

        let mut indices: Vec<usize> = (0..source.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let train_size = (source.len() as f64 * train_proportion) as usize;
        let test_indices = indices.split_off(train_size);

        Ok(Self {
            source,
            train_proportion,
            seed,
            train_indices: indices,
            test_indices,
        })
    }

    pub fn train_proportion(&self) -> f64 {
        self.train_proportion
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Training partition
    pub fn train(&self) -> SplitDataSource {
        self.partition(true)
    }

    /// Test partition
    pub fn test(&self) -> SplitDataSource {
        self.partition(false)
    }

    fn partition(&self, is_train: bool) -> SplitDataSource {
        let indices = if is_train {
            &self.train_indices
        } else {
            &self.test_indices
        };
        let all = self.source.samples();
        SplitDataSource {
            samples: indices.iter().map(|&i| all[i].clone()).collect(),
            feature_names: self.source.feature_names().to_vec(),
            source_provenance: self.source.provenance(),
            seed: self.seed,
            train_proportion: self.train_proportion,
            is_train,
        }
    }
}

/// One side of a [`TrainTestSplitter`]
#[derive(Debug, Clone)]
pub struct SplitDataSource {
    samples: Vec<Sample>,
    feature_names: Vec<String>,
    source_provenance: ObjectProvenance,
    seed: u64,
    train_proportion: f64,
    is_train: bool,
}

impl SplitDataSource {
    pub fn is_train(&self) -> bool {
        self.is_train
    }
}

impl DataSource for SplitDataSource {
    fn samples(&self) -> &[Sample] {
        &self.samples
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::non_configurable(
            ObjectKind::SplitDataSource,
            TrainTestSplitter::CLASS_NAME,
        )
        .with_instance(SPLIT_SOURCE, self.source_provenance.clone())
        .with_instance(SPLIT_SEED, self.seed as i64)
        .with_instance(SPLIT_TRAIN_PROPORTION, self.train_proportion)
        .with_instance(SPLIT_IS_TRAIN, self.is_train)
    }
}
