//! Reproducing models from their provenance
//!
//! A [`Reproducer`] turns a model provenance back into a configured trainer and dataset,
//! retrains, and optionally checks that the retrained model sees the same feature and
//! label domains as the original. The usual flow is
//! `Initialized -> ConfigLoaded -> TrainerRecovered -> DatasetRecovered -> Retrained`,
//! followed by `Validated` when reproducing from an existing model.

use crate::core::{DataSource, Dataset, ReproError, Result, Trainer, ValidationKind};
use crate::data::TrainTestSplitter;
use crate::model::Model;
use crate::provenance::{
    diff_provenance, extract, order, ModelProvenance, ObjectKind, ObjectProvenance,
    Property, ProvenanceOrdering, SOURCE_PROVENANCE, SPLIT_IS_TRAIN, SPLIT_SEED, SPLIT_SOURCE,
    SPLIT_TRAIN_PROPORTION, TRAIN_INVOCATION_COUNT,
};
use crate::registry::{Catalog, ComponentKind, ConfigurationManager};
use crate::trainer::INITIAL_RNG_DRAWS;
use log::{debug, info};
use std::sync::Arc;

/// Progress of a reproduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReproState {
    Initialized,
    ConfigLoaded,
    TrainerRecovered,
    DatasetRecovered,
    Retrained,
    Validated,
}

/// Rebuilds and retrains the pipeline recorded in a model provenance
pub struct Reproducer {
    provenance: ModelProvenance,
    original: Option<Model>,
    manager: ConfigurationManager,
    state: ReproState,
}

impl Reproducer {
    /// Prepare to reproduce from a provenance alone
    pub fn from_provenance(provenance: ModelProvenance, catalog: Arc<Catalog>) -> Result<Self> {
        let mut reproducer = Self {
            provenance,
            original: None,
            manager: ConfigurationManager::new(catalog),
            state: ReproState::Initialized,
        };
        let configs = extract(reproducer.provenance.object())?;
        debug!("Extracted {} component configurations", configs.len());
        reproducer.manager.add_configurations(configs)?;
        reproducer.state = ReproState::ConfigLoaded;
        Ok(reproducer)
    }

    /// Prepare to reproduce an existing model, which the result is validated against
    pub fn from_model(model: Model, catalog: Arc<Catalog>) -> Result<Self> {
        let mut reproducer = Self::from_provenance(model.provenance().clone(), catalog)?;
        reproducer.original = Some(model);
        Ok(reproducer)
    }

    pub fn state(&self) -> ReproState {
        self.state
    }

    pub fn provenance(&self) -> &ModelProvenance {
        &self.provenance
    }

    pub fn original_model(&self) -> Option<&Model> {
        self.original.as_ref()
    }

    pub fn configuration_manager(&self) -> &ConfigurationManager {
        &self.manager
    }

    /// Mutable access, e.g. to override recorded configuration before recovery
    pub fn configuration_manager_mut(&mut self) -> &mut ConfigurationManager {
        &mut self.manager
    }

    /// Point every recorded data source at `path`; returns how many were changed
    pub fn relocate_data(&mut self, path: &str) -> Result<usize> {
        let names: Vec<String> = self
            .manager
            .configs()
            .iter()
            .filter(|config| {
                self.manager.catalog().kind_of(config.class_name())
                    == Some(ComponentKind::DataSource)
            })
            .map(|config| config.name().to_string())
            .collect();
        for name in &names {
            info!("Relocating data source {name} to {path}");
            self.manager
                .set_property(name, "path", Property::Value(path.to_string()))?;
        }
        Ok(names.len())
    }

    /// Rebuild the trainer with every recorded invocation count restored
    pub fn recover_trainer(&mut self) -> Result<Arc<dyn Trainer>> {
        let root = self
            .provenance
            .trainer()
            .map_err(|e| ReproError::TrainerRecovery(e.to_string()))?;
        if !root.is_configurable() {
            return Err(ReproError::TrainerRecovery(format!(
                "trainer '{}' was recorded without its configuration",
                root.class_name()
            )));
        }

        let ordering = order(self.provenance.object());
        for (position, object) in ordering.iter() {
            if object.kind() != ObjectKind::Trainer || !object.is_configurable() {
                continue;
            }
            let name = ordering.name(position);
            let count = object.get_long(TRAIN_INVOCATION_COUNT).ok_or_else(|| {
                ReproError::TrainerRecovery(format!(
                    "trainer {name} has no usable {TRAIN_INVOCATION_COUNT}"
                ))
            })?;
            if count < 0 {
                return Err(ReproError::TrainerRecovery(format!(
                    "trainer {name} records a negative {TRAIN_INVOCATION_COUNT} ({count})"
                )));
            }
            debug!("Restoring {count} RNG draws for {name}");
            self.manager
                .set_property(&name, INITIAL_RNG_DRAWS, Property::Value(count.to_string()))?;
        }

        let class_name = root.class_name();
        if !self.manager.catalog().contains(class_name) {
            return Err(ReproError::TrainerRecovery(format!(
                "no constructor registered for trainer class '{class_name}'"
            )));
        }
        let trainer = self
            .manager
            .list_all(class_name)?
            .into_iter()
            .find_map(|(_, component)| component.as_trainer().cloned())
            .ok_or_else(|| {
                ReproError::TrainerRecovery(format!(
                    "no configured component of class '{class_name}'"
                ))
            })?;

        info!(
            "Recovered trainer {} (invocation count {})",
            class_name,
            trainer.invocation_count()
        );
        self.state = ReproState::TrainerRecovered;
        Ok(trainer)
    }

    /// Rebuild the training dataset, replaying any train/test split
    ///
    /// The dataset directly over the data source is rebuilt from the catalog's wrappers, then
    /// every dataset recorded around it is reapplied, innermost first.
    pub fn recover_dataset(&mut self) -> Result<Arc<dyn Dataset>> {
        let recorded = self
            .provenance
            .dataset()
            .map_err(|e| ReproError::DatasetRecovery(e.to_string()))?;
        let (leaf, wrapper) = recorded.innermost_source()?;
        let ordering = order(self.provenance.object());

        // Datasets layered over `wrapper`, outermost first
        let mut outer = Vec::new();
        let mut current = recorded;
        while !std::ptr::eq(current, wrapper) {
            outer.push(current);
            current = current.get_object(SOURCE_PROVENANCE).ok_or_else(|| {
                ReproError::DatasetRecovery(format!(
                    "dataset {} has no {SOURCE_PROVENANCE}",
                    current.class_name()
                ))
            })?;
        }

        let source = recover_source(&mut self.manager, &ordering, leaf)?;
        let catalog = self.manager.catalog();
        let mut dataset = catalog.wrap_dataset(wrapper.class_name(), source)?;
        for layer in outer.into_iter().rev() {
            debug!("Rewrapping recovered dataset in {}", layer.class_name());
            dataset = catalog.rewrap_dataset(layer, dataset)?;
        }

        info!(
            "Recovered {} with {} samples",
            recorded.class_name(),
            dataset.len()
        );
        self.state = ReproState::DatasetRecovered;
        Ok(dataset)
    }

    /// Recover the trainer and dataset, then train a new model
    pub fn reproduce_from_provenance(&mut self) -> Result<Model> {
        let trainer = self.recover_trainer()?;
        let dataset = self.recover_dataset()?;
        let model = trainer.train(dataset.as_ref())?;
        self.state = ReproState::Retrained;
        Ok(model)
    }

    /// Reproduce and check the result against the original model
    pub fn reproduce_from_model(&mut self) -> Result<Model> {
        if self.original.is_none() {
            return Err(ReproError::Validation {
                kind: ValidationKind::MissingModel,
            });
        }
        let reproduced = self.reproduce_from_provenance()?;
        if let Some(original) = &self.original {
            validate(original, &reproduced)?;
        }
        self.state = ReproState::Validated;
        Ok(reproduced)
    }

    /// Diff the reproduced provenance against `model`'s, as pretty JSON
    pub fn diff_against(&self, model: &Model) -> Result<String> {
        diff_provenance(&self.provenance, model.provenance())
    }
}

/// Build the live data source for a leaf of a dataset's source chain
fn recover_source(
    manager: &mut ConfigurationManager,
    ordering: &ProvenanceOrdering<'_>,
    leaf: &ObjectProvenance,
) -> Result<Arc<dyn DataSource>> {
    match leaf.kind() {
        ObjectKind::SplitDataSource => {
            let malformed = |key: &str| {
                ReproError::DatasetRecovery(format!(
                    "split source '{}' has no usable '{key}'",
                    leaf.class_name()
                ))
            };
            let inner = leaf
                .get_object(SPLIT_SOURCE)
                .ok_or_else(|| malformed(SPLIT_SOURCE))?;
            let seed = leaf.get_long(SPLIT_SEED).ok_or_else(|| malformed(SPLIT_SEED))?;
            let proportion = leaf
                .get_double(SPLIT_TRAIN_PROPORTION)
                .ok_or_else(|| malformed(SPLIT_TRAIN_PROPORTION))?;
            let is_train = leaf
                .get_bool(SPLIT_IS_TRAIN)
                .ok_or_else(|| malformed(SPLIT_IS_TRAIN))?;

            let inner = match inner.kind() {
                ObjectKind::Dataset => inner.innermost_source()?.0,
                _ => inner,
            };
            let inner_source = recover_source(manager, ordering, inner)?;
            debug!(
                "Replaying split with seed {seed} and train proportion {proportion} ({} partition)",
                if is_train { "train" } else { "test" }
            );
            let splitter = TrainTestSplitter::new(inner_source, proportion, seed as u64)
                .map_err(|e| ReproError::DatasetRecovery(e.to_string()))?;
            let partition: Arc<dyn DataSource> = if is_train {
                Arc::new(splitter.train())
            } else {
                Arc::new(splitter.test())
            };
            Ok(partition)
        }
        ObjectKind::DataSource => {
            if !leaf.is_configurable() {
                return Err(ReproError::DatasetRecovery(format!(
                    "data source '{}' is not configurable and cannot be replayed",
                    leaf.class_name()
                )));
            }
            if manager.catalog().kind_of(leaf.class_name()) != Some(ComponentKind::DataSource) {
                return Err(ReproError::DatasetRecovery(format!(
                    "no data source registered for class '{}'",
                    leaf.class_name()
                )));
            }
            let name = ordering
                .position_of(leaf)
                .map(|position| ordering.name(position))
                .ok_or_else(|| {
                    ReproError::DatasetRecovery(format!(
                        "data source '{}' is not part of the provenance",
                        leaf.class_name()
                    ))
                })?;
            let component = manager.lookup(&name)?;
            component.as_data_source().cloned().ok_or_else(|| {
                ReproError::DatasetRecovery(format!("component {name} is not a data source"))
            })
        }
        other => Err(ReproError::DatasetRecovery(format!(
            "expected a data source, found a {} ({})",
            other.as_str(),
            leaf.class_name()
        ))),
    }
}

/// Feature and label domains must match, compared by their rendered form
fn validate(original: &Model, reproduced: &Model) -> Result<()> {
    let (a, b) = (original.feature_map(), reproduced.feature_map());
    if a.size() != b.size() {
        return Err(ReproError::Validation {
            kind: ValidationKind::FeatureMapSize {
                original: a.size(),
                reproduced: b.size(),
            },
        });
    }
    if let Some(index) = a
        .iter()
        .zip(b.iter())
        .position(|(x, y)| x.to_string() != y.to_string())
    {
        return Err(ReproError::Validation {
            kind: ValidationKind::FeatureIdentity { index },
        });
    }
    if original.label_info().to_string() != reproduced.label_info().to_string() {
        return Err(ReproError::Validation {
            kind: ValidationKind::OutputDomain,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CSVSource, InMemorySource, MutableDataset};
    use crate::core::{Sample, SparseVector};
    use crate::trainer::SvmTrainer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y,label").unwrap();
        for (x, y, label) in [
            (2.0, 1.0, 1),
            (1.5, 2.0, 1),
            (3.0, 2.5, 1),
            (2.5, 0.5, 1),
            (-2.0, -1.0, -1),
            (-1.5, -2.0, -1),
            (-3.0, -0.5, -1),
            (-2.5, -2.5, -1),
        ] {
            writeln!(file, "{x},{y},{label}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn trained_model(file: &NamedTempFile) -> Model {
        let source = CSVSource::from_file(file.path()).unwrap();
        let dataset = MutableDataset::from_source(&source).unwrap();
        SvmTrainer::new().with_seed(42).train(&dataset).unwrap()
    }

    #[test]
    fn test_state_progression() {
        let file = csv_file();
        let model = trained_model(&file);
        let mut reproducer = Reproducer::from_model(model, Arc::new(Catalog::standard())).unwrap();
        assert_eq!(reproducer.state(), ReproState::ConfigLoaded);

        reproducer.recover_trainer().unwrap();
        assert_eq!(reproducer.state(), ReproState::TrainerRecovered);
        reproducer.recover_dataset().unwrap();
        assert_eq!(reproducer.state(), ReproState::DatasetRecovered);
        reproducer.reproduce_from_model().unwrap();
        assert_eq!(reproducer.state(), ReproState::Validated);
    }

    #[test]
    fn test_missing_model_is_a_validation_error() {
        let file = csv_file();
        let provenance = trained_model(&file).provenance().clone();
        let mut reproducer =
            Reproducer::from_provenance(provenance, Arc::new(Catalog::standard())).unwrap();

        let err = reproducer.reproduce_from_model().unwrap_err();
        assert!(matches!(
            err,
            ReproError::Validation {
                kind: ValidationKind::MissingModel
            }
        ));
        assert!(reproducer.reproduce_from_provenance().is_ok());
        assert_eq!(reproducer.state(), ReproState::Retrained);
    }

    #[test]
    fn test_in_memory_data_cannot_be_replayed() {
        let samples = vec![
            Sample::new(SparseVector::new(vec![0], vec![1.0]), 1.0),
            Sample::new(SparseVector::new(vec![0], vec![-1.0]), -1.0),
        ];
        let source = InMemorySource::new(vec!["x".to_string()], samples);
        let dataset = MutableDataset::from_source(&source).unwrap();
        let model = SvmTrainer::new().train(&dataset).unwrap();

        let mut reproducer = Reproducer::from_model(model, Arc::new(Catalog::standard())).unwrap();
        assert!(reproducer.recover_trainer().is_ok());
        assert!(matches!(
            reproducer.recover_dataset(),
            Err(ReproError::DatasetRecovery(_))
        ));
    }

    #[test]
    fn test_validate_reports_each_kind() {
        let file = csv_file();
        let original = trained_model(&file);

        let mut fewer = NamedTempFile::new().unwrap();
        writeln!(fewer, "x,label\n1.0,1\n-1.0,-1").unwrap();
        fewer.flush().unwrap();
        let narrow = trained_model(&fewer);
        assert!(matches!(
            validate(&original, &narrow),
            Err(ReproError::Validation {
                kind: ValidationKind::FeatureMapSize { original: 2, reproduced: 1 }
            })
        ));

        let mut renamed = NamedTempFile::new().unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap().replacen("x,y", "x,z", 1);
        write!(renamed, "{content}").unwrap();
        renamed.flush().unwrap();
        assert!(matches!(
            validate(&original, &trained_model(&renamed)),
            Err(ReproError::Validation {
                kind: ValidationKind::FeatureIdentity { index: 1 }
            })
        ));

        let mut relabelled = NamedTempFile::new().unwrap();
        let content = std::fs::read_to_string(file.path())
            .unwrap()
            .replacen("2.5,0.5,1", "2.5,0.5,-1", 1);
        write!(relabelled, "{content}").unwrap();
        relabelled.flush().unwrap();
        assert!(matches!(
            validate(&original, &trained_model(&relabelled)),
            Err(ReproError::Validation {
                kind: ValidationKind::OutputDomain
            })
        ));

        assert!(validate(&original, &trained_model(&file)).is_ok());
    }
}
