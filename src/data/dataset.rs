//! Dataset wrappers over data sources

use crate::core::{DataSource, Dataset, FeatureMap, LabelInfo, ReproError, Result, Sample};
use crate::provenance::{ObjectKind, ObjectProvenance, SOURCE_PROVENANCE};
use std::sync::Arc;

/// Provenance key holding a [`MinimumCardinalityDataset`]'s threshold
pub const MIN_CARDINALITY: &str = "min-cardinality";
use std::collections::BTreeMap;

/// A dataset holding every sample of its data source
#[derive(Debug, Clone)]
pub struct MutableDataset {
    samples: Vec<Sample>,
    feature_map: FeatureMap,
    label_info: LabelInfo,
    source_provenance: ObjectProvenance,
}

impl MutableDataset {
    pub const CLASS_NAME: &'static str = "MutableDataset";

    /// Materialize a data source
    pub fn from_source(source: &dyn DataSource) -> Result<Self> {
        if source.is_empty() {
            return Err(ReproError::EmptyDataset);
        }
        let samples = source.samples().to_vec();
        Ok(Self {
            feature_map: FeatureMap::observe(source.feature_names(), &samples),
            label_info: LabelInfo::observe(&samples),
            samples,
            source_provenance: source.provenance(),
        })
    }
}

impl Dataset for MutableDataset {
    fn samples(&self) -> &[Sample] {
        &self.samples
    }

    fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    fn label_info(&self) -> &LabelInfo {
        &self.label_info
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::non_configurable(ObjectKind::Dataset, Self::CLASS_NAME)
            .with_instance(SOURCE_PROVENANCE, self.source_provenance.clone())
            .with_instance("num-examples", self.samples.len() as i64)
            .with_instance("num-features", self.feature_map.size() as i64)
    }
}

/// A view of another dataset without the features seen fewer than `min_cardinality` times
///
/// Remaining features are renumbered densely; samples left without any feature are dropped.
/// The wrapped dataset's provenance becomes this dataset's `source-provenance`.
#[derive(Debug, Clone)]
pub struct MinimumCardinalityDataset {
    samples: Vec<Sample>,
    feature_map: FeatureMap,
    label_info: LabelInfo,
    min_cardinality: usize,
    removed_features: usize,
    source_provenance: ObjectProvenance,
}

impl MinimumCardinalityDataset {
    pub const CLASS_NAME: &'static str = "MinimumCardinalityDataset";

    pub fn new(inner: &dyn Dataset, min_cardinality: usize) -> Result<Self> {
        // old id -> new id for the surviving features
        let kept: BTreeMap<usize, usize> = inner
            .feature_map()
            .iter()
            .filter(|info| info.count >= min_cardinality)
            .enumerate()
            .map(|(new_id, info)| (info.id, new_id))
            .collect();
        let names: Vec<String> = inner
            .feature_map()
            .iter()
            .filter(|info| kept.contains_key(&info.id))
            .map(|info| info.name.clone())
            .collect();

        let samples: Vec<Sample> = inner
            .samples()
            .iter()
            .map(|sample| {
                let features = sample.features.retain_remapped(
                    |idx| kept.contains_key(&idx),
                    |idx| kept.get(&idx).copied().unwrap_or(idx),
                );
                Sample::new(features, sample.label)
            })
            .filter(|sample| !sample.features.is_empty())
            .collect();
        if samples.is_empty() {
            return Err(ReproError::InvalidDataset(format!(
                "No samples keep a feature seen at least {min_cardinality} times"
            )));
        }

        Ok(Self {
            feature_map: FeatureMap::observe(&names, &samples),
            label_info: LabelInfo::observe(&samples),
            removed_features: inner.feature_map().size() - kept.len(),
            samples,
            min_cardinality,
            source_provenance: inner.provenance(),
        })
    }

    /// Apply the threshold recorded in `recorded` to a rebuilt inner dataset
    pub fn replay(
        inner: Arc<dyn Dataset>,
        recorded: &ObjectProvenance,
    ) -> Result<Arc<dyn Dataset>> {
        let min_cardinality = recorded
            .get_long(MIN_CARDINALITY)
            .filter(|&n| n >= 0)
            .ok_or_else(|| {
                ReproError::DatasetRecovery(format!(
                    "{} has no usable {MIN_CARDINALITY}",
                    recorded.class_name()
                ))
            })?;
        let dataset = Self::new(inner.as_ref(), min_cardinality as usize)?;
        Ok(Arc::new(dataset))
    }

    /// Number of features dropped from the wrapped dataset
    pub fn removed_features(&self) -> usize {
        self.removed_features
    }
}

impl Dataset for MinimumCardinalityDataset {
    fn samples(&self) -> &[Sample] {
        &self.samples
    }

    fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    fn label_info(&self) -> &LabelInfo {
        &self.label_info
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::non_configurable(ObjectKind::Dataset, Self::CLASS_NAME)
            .with_instance(SOURCE_PROVENANCE, self.source_provenance.clone())
            .with_instance(MIN_CARDINALITY, self.min_cardinality as i64)
            .with_instance("num-examples", self.samples.len() as i64)
            .with_instance("num-features", self.feature_map.size() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::data::InMemorySource;

    fn source() -> InMemorySource {
        let names = vec!["common".to_string(), "rare".to_string(), "mid".to_string()];
        let samples = vec![
            Sample::new(SparseVector::new(vec![0, 1], vec![1.0, 9.0]), 1.0),
            Sample::new(SparseVector::new(vec![0, 2], vec![2.0, 3.0]), -1.0),
            Sample::new(SparseVector::new(vec![0, 2], vec![3.0, 4.0]), 1.0),
            Sample::new(SparseVector::new(vec![1], vec![5.0]), -1.0),
        ];
        InMemorySource::new(names, samples)
    }

    #[test]
    fn test_mutable_dataset_domains() {
        let dataset = MutableDataset::from_source(&source()).unwrap();

        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.dim(), 3);
        assert_eq!(dataset.feature_map().get(0).unwrap().count, 3);
        assert_eq!(dataset.label_info().count("-1"), 2);

        let provenance = dataset.provenance();
        assert_eq!(provenance.class_name(), "MutableDataset");
        assert_eq!(
            provenance.get_object(SOURCE_PROVENANCE).map(|s| s.class_name()),
            Some("InMemorySource")
        );
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let empty = InMemorySource::new(vec!["x".to_string()], Vec::new());
        assert!(matches!(
            MutableDataset::from_source(&empty),
            Err(ReproError::EmptyDataset)
        ));
    }

    #[test]
    fn test_minimum_cardinality_drops_rare_features() {
        let inner = MutableDataset::from_source(&source()).unwrap();
        let dataset = MinimumCardinalityDataset::new(&inner, 3).unwrap();

        // Only "common" survives; the sample holding only "rare" is dropped
        assert_eq!(dataset.dim(), 1);
        assert_eq!(dataset.removed_features(), 2);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_map().get(0).unwrap().name, "common");
    }

    #[test]
    fn test_minimum_cardinality_renumbers_features() {
        let inner = MutableDataset::from_source(&source()).unwrap();
        let dataset = MinimumCardinalityDataset::new(&inner, 2).unwrap();

        // "rare" (2 occurrences) and "mid" survive with dense ids
        assert_eq!(dataset.dim(), 3);
        let dataset = MinimumCardinalityDataset::new(&inner, 3).unwrap();
        assert_eq!(dataset.samples()[1].features.indices, vec![0]);
    }

    #[test]
    fn test_replay_applies_recorded_threshold() {
        let inner = MutableDataset::from_source(&source()).unwrap();
        let original = MinimumCardinalityDataset::new(&inner, 3).unwrap();

        let rebuilt: Arc<dyn Dataset> = Arc::new(inner.clone());
        let replayed = MinimumCardinalityDataset::replay(rebuilt, &original.provenance()).unwrap();
        assert_eq!(replayed.feature_map(), original.feature_map());
        assert_eq!(replayed.len(), original.len());

        let missing =
            ObjectProvenance::non_configurable(ObjectKind::Dataset, "MinimumCardinalityDataset");
        let rebuilt: Arc<dyn Dataset> = Arc::new(inner);
        assert!(matches!(
            MinimumCardinalityDataset::replay(rebuilt, &missing),
            Err(ReproError::DatasetRecovery(_))
        ));
    }

    #[test]
    fn test_minimum_cardinality_is_double_wrapped() {
        let inner = MutableDataset::from_source(&source()).unwrap();
        let provenance = MinimumCardinalityDataset::new(&inner, 2).unwrap().provenance();

        let (leaf, wrapper) = provenance.innermost_source().unwrap();
        assert_eq!(leaf.class_name(), "InMemorySource");
        assert_eq!(wrapper.class_name(), "MutableDataset");
    }
}
