//! Provenance records
//!
//! A provenance tree is an immutable record of how an artifact was produced. Models carry a
//! [`ModelProvenance`] whose `dataset` and `trainer` entries describe, recursively, every
//! configured component that took part in training. The tree is what the
//! [`crate::repro::Reproducer`] replays and what [`diff`] compares.

pub mod diff;
pub mod extract;
pub mod ordering;

pub use self::diff::{
    diff, diff_provenance, diff_provenance_with_labels, DiffEntry, DiffLabels, DiffReport, Side,
};
pub use self::extract::{extract, ComponentConfig, Property};
pub use self::ordering::{compute_name, order, ProvenanceOrdering};

use crate::core::{ReproError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which every object exposes its class name
pub const CLASS_NAME: &str = "class-name";
/// Key of a dataset's source (a data source, a split, or another dataset)
pub const SOURCE_PROVENANCE: &str = "source-provenance";
/// Key of the trainer instance value recording prior `train` calls
pub const TRAIN_INVOCATION_COUNT: &str = "train-invocation-count";
/// Keys of a split data source
pub const SPLIT_SOURCE: &str = "source";
pub const SPLIT_SEED: &str = "seed";
pub const SPLIT_TRAIN_PROPORTION: &str = "train-proportion";
pub const SPLIT_IS_TRAIN: &str = "is-train";
/// Keys of a model provenance
pub const MODEL_DATASET: &str = "dataset";
pub const MODEL_TRAINER: &str = "trainer";
pub const MODEL_TRAINED_AT: &str = "trained-at";

/// A single recorded scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::String(s) => write!(f, "{s}"),
            PrimitiveValue::Long(v) => write!(f, "{v}"),
            // Debug formatting keeps the decimal point on integral values ("1.0")
            PrimitiveValue::Double(v) => write!(f, "{v:?}"),
            PrimitiveValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::String(value.to_string())
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::String(value)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(value: i64) -> Self {
        PrimitiveValue::Long(value)
    }
}

impl From<f64> for PrimitiveValue {
    fn from(value: f64) -> Self {
        PrimitiveValue::Double(value)
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        PrimitiveValue::Boolean(value)
    }
}

/// What an object provenance describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Model,
    Trainer,
    Dataset,
    DataSource,
    SplitDataSource,
    /// Any other configured object, e.g. a kernel
    Component,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Model => "model",
            ObjectKind::Trainer => "trainer",
            ObjectKind::Dataset => "dataset",
            ObjectKind::DataSource => "data-source",
            ObjectKind::SplitDataSource => "split-data-source",
            ObjectKind::Component => "component",
        }
    }
}

/// A node of a provenance tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvenanceNode {
    Primitive(PrimitiveValue),
    List(Vec<ProvenanceNode>),
    Map(BTreeMap<String, ProvenanceNode>),
    Object(ObjectProvenance),
}

impl ProvenanceNode {
    /// Short name of the node kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProvenanceNode::Primitive(_) => "primitive",
            ProvenanceNode::List(_) => "list",
            ProvenanceNode::Map(_) => "map",
            ProvenanceNode::Object(obj) => obj.kind.as_str(),
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            ProvenanceNode::Primitive(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectProvenance> {
        match self {
            ProvenanceNode::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<PrimitiveValue> for ProvenanceNode {
    fn from(value: PrimitiveValue) -> Self {
        ProvenanceNode::Primitive(value)
    }
}

impl From<ObjectProvenance> for ProvenanceNode {
    fn from(value: ObjectProvenance) -> Self {
        ProvenanceNode::Object(value)
    }
}

impl From<Vec<ProvenanceNode>> for ProvenanceNode {
    fn from(value: Vec<ProvenanceNode>) -> Self {
        ProvenanceNode::List(value)
    }
}

impl From<BTreeMap<String, ProvenanceNode>> for ProvenanceNode {
    fn from(value: BTreeMap<String, ProvenanceNode>) -> Self {
        ProvenanceNode::Map(value)
    }
}

impl From<&str> for ProvenanceNode {
    fn from(value: &str) -> Self {
        ProvenanceNode::Primitive(value.into())
    }
}

impl From<String> for ProvenanceNode {
    fn from(value: String) -> Self {
        ProvenanceNode::Primitive(value.into())
    }
}

impl From<i64> for ProvenanceNode {
    fn from(value: i64) -> Self {
        ProvenanceNode::Primitive(value.into())
    }
}

impl From<f64> for ProvenanceNode {
    fn from(value: f64) -> Self {
        ProvenanceNode::Primitive(value.into())
    }
}

impl From<bool> for ProvenanceNode {
    fn from(value: bool) -> Self {
        ProvenanceNode::Primitive(value.into())
    }
}

/// Provenance of one object: its class, its configuration and recorded instance values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectProvenance {
    kind: ObjectKind,
    class_name: String,
    configurable: bool,
    configured: Vec<(String, ProvenanceNode)>,
    instance: Vec<(String, ProvenanceNode)>,
}

impl ObjectProvenance {
    /// Provenance of an object that can be rebuilt from its configured fields
    pub fn new(kind: ObjectKind, class_name: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            configurable: true,
            configured: Vec::new(),
            instance: Vec::new(),
        }
    }

    /// Provenance of an object that only records what it was, e.g. in-memory data
    pub fn non_configurable(kind: ObjectKind, class_name: impl Into<String>) -> Self {
        Self {
            configurable: false,
            ..Self::new(kind, class_name)
        }
    }

    /// Add a configured field
    pub fn with_configured(
        mut self,
        key: impl Into<String>,
        value: impl Into<ProvenanceNode>,
    ) -> Self {
        self.configured.push((key.into(), value.into()));
        self
    }

    /// Add a recorded instance value
    pub fn with_instance(
        mut self,
        key: impl Into<String>,
        value: impl Into<ProvenanceNode>,
    ) -> Self {
        self.instance.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    pub fn configured_fields(&self) -> &[(String, ProvenanceNode)] {
        &self.configured
    }

    pub fn instance_fields(&self) -> &[(String, ProvenanceNode)] {
        &self.instance
    }

    /// Configured then instance fields, in recorded order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ProvenanceNode)> {
        self.configured
            .iter()
            .chain(self.instance.iter())
            .map(|(key, node)| (key.as_str(), node))
    }

    /// Look up a field by key, configured fields first
    pub fn field(&self, key: &str) -> Option<&ProvenanceNode> {
        self.fields().find(|(k, _)| *k == key).map(|(_, node)| node)
    }

    /// All children keyed by name, including the class name
    pub fn children(&self) -> Vec<(String, ProvenanceNode)> {
        let mut children = Vec::with_capacity(1 + self.configured.len() + self.instance.len());
        children.push((CLASS_NAME.to_string(), self.class_name.as_str().into()));
        children.extend(self.fields().map(|(k, node)| (k.to_string(), node.clone())));
        children
    }

    pub fn get_primitive(&self, key: &str) -> Option<&PrimitiveValue> {
        self.field(key).and_then(ProvenanceNode::as_primitive)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get_primitive(key) {
            Some(PrimitiveValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get_primitive(key) {
            Some(PrimitiveValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_primitive(key) {
            Some(PrimitiveValue::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get_primitive(key) {
            Some(PrimitiveValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&ObjectProvenance> {
        self.field(key).and_then(ProvenanceNode::as_object)
    }

    /// Follow a dataset's `source-provenance` chain down to the first real data source
    ///
    /// Returns the leaf source together with the dataset that directly wraps it.
    pub fn innermost_source(&self) -> Result<(&ObjectProvenance, &ObjectProvenance)> {
        let mut dataset = self;
        loop {
            if dataset.kind != ObjectKind::Dataset {
                return Err(ReproError::DatasetRecovery(format!(
                    "expected a dataset provenance, found {} ({})",
                    dataset.kind.as_str(),
                    dataset.class_name
                )));
            }
            let source = dataset.get_object(SOURCE_PROVENANCE).ok_or_else(|| {
                ReproError::DatasetRecovery(format!(
                    "dataset {} has no {SOURCE_PROVENANCE}",
                    dataset.class_name
                ))
            })?;
            match source.kind {
                ObjectKind::Dataset => dataset = source,
                ObjectKind::DataSource | ObjectKind::SplitDataSource => {
                    return Ok((source, dataset))
                }
                ObjectKind::Model | ObjectKind::Trainer | ObjectKind::Component => {
                    return Err(ReproError::DatasetRecovery(format!(
                        "dataset {} is backed by a {} ({}), not a data source",
                        dataset.class_name,
                        source.kind.as_str(),
                        source.class_name
                    )))
                }
            }
        }
    }
}

fn sorted_fields(fields: &[(String, ProvenanceNode)]) -> BTreeMap<&str, &ProvenanceNode> {
    fields.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

impl PartialEq for ObjectProvenance {
    // Field order is a display concern only
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.class_name == other.class_name
            && self.configurable == other.configurable
            && sorted_fields(&self.configured) == sorted_fields(&other.configured)
            && sorted_fields(&self.instance) == sorted_fields(&other.instance)
    }
}

/// Provenance of a trained model: the root of a provenance tree
///
/// Deserialization goes through [`ModelProvenance::from_object`], so a loaded tree always
/// has a dataset and a trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectProvenance", into = "ObjectProvenance")]
pub struct ModelProvenance(ObjectProvenance);

impl ModelProvenance {
    /// Record a model trained now
    pub fn new(
        class_name: impl Into<String>,
        dataset: ObjectProvenance,
        trainer: ObjectProvenance,
    ) -> Self {
        Self::trained_at(class_name, dataset, trainer, Utc::now())
    }

    /// Record a model trained at the given time
    pub fn trained_at(
        class_name: impl Into<String>,
        dataset: ObjectProvenance,
        trainer: ObjectProvenance,
        trained_at: DateTime<Utc>,
    ) -> Self {
        let object = ObjectProvenance::non_configurable(ObjectKind::Model, class_name)
            .with_instance(MODEL_DATASET, dataset)
            .with_instance(MODEL_TRAINER, trainer)
            .with_instance(MODEL_TRAINED_AT, trained_at.to_rfc3339())
            .with_instance("library-version", crate::VERSION)
            .with_instance("os-name", std::env::consts::OS)
            .with_instance("os-arch", std::env::consts::ARCH);
        Self(object)
    }

    /// Wrap an object provenance, checking it has the shape of a model provenance
    pub fn from_object(object: ObjectProvenance) -> Result<Self> {
        let provenance = Self(object);
        if provenance.0.kind != ObjectKind::Model {
            return Err(ReproError::Extraction {
                path: String::new(),
                message: format!(
                    "root provenance is a {}, expected a model",
                    provenance.0.kind.as_str()
                ),
            });
        }
        provenance.dataset()?;
        provenance.trainer()?;
        Ok(provenance)
    }

    pub fn object(&self) -> &ObjectProvenance {
        &self.0
    }

    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }

    /// Provenance of the training dataset
    pub fn dataset(&self) -> Result<&ObjectProvenance> {
        self.required(MODEL_DATASET, ObjectKind::Dataset)
    }

    /// Provenance of the trainer
    pub fn trainer(&self) -> Result<&ObjectProvenance> {
        self.required(MODEL_TRAINER, ObjectKind::Trainer)
    }

    fn required(&self, key: &str, kind: ObjectKind) -> Result<&ObjectProvenance> {
        match self.0.get_object(key) {
            Some(obj) if obj.kind == kind => Ok(obj),
            Some(obj) => Err(ReproError::Extraction {
                path: key.to_string(),
                message: format!("expected a {}, found a {}", kind.as_str(), obj.kind.as_str()),
            }),
            None => Err(ReproError::Extraction {
                path: key.to_string(),
                message: "missing from model provenance".to_string(),
            }),
        }
    }

    /// The tree as a plain node, e.g. for diffing
    pub fn to_node(&self) -> ProvenanceNode {
        ProvenanceNode::Object(self.0.clone())
    }
}

impl TryFrom<ObjectProvenance> for ModelProvenance {
    type Error = ReproError;

    fn try_from(object: ObjectProvenance) -> Result<Self> {
        Self::from_object(object)
    }
}

impl From<ModelProvenance> for ObjectProvenance {
    fn from(provenance: ModelProvenance) -> Self {
        provenance.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_source() -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::DataSource, "CSVSource")
            .with_configured("path", "train.csv")
    }

    fn dataset_over(source: ObjectProvenance) -> ObjectProvenance {
        ObjectProvenance::non_configurable(ObjectKind::Dataset, "MutableDataset")
            .with_instance(SOURCE_PROVENANCE, source)
    }

    #[test]
    fn test_primitive_display() {
        assert_eq!(PrimitiveValue::from(1.0).to_string(), "1.0");
        assert_eq!(PrimitiveValue::from(0.8).to_string(), "0.8");
        assert_eq!(PrimitiveValue::from(42i64).to_string(), "42");
        assert_eq!(PrimitiveValue::from(false).to_string(), "false");
        assert_eq!(PrimitiveValue::from("red").to_string(), "red");
    }

    #[test]
    fn test_object_equality_ignores_field_order() {
        let a = ObjectProvenance::new(ObjectKind::Component, "RBFKernel")
            .with_configured("gamma", 0.5)
            .with_configured("scale", 2i64);
        let b = ObjectProvenance::new(ObjectKind::Component, "RBFKernel")
            .with_configured("scale", 2i64)
            .with_configured("gamma", 0.5);
        assert_eq!(a, b);

        let c = b.clone().with_configured("extra", true);
        assert_ne!(a, c);
    }

    #[test]
    fn test_children_start_with_class_name() {
        let children = csv_source().with_instance("rows", 10i64).children();
        let keys: Vec<&str> = children.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec![CLASS_NAME, "path", "rows"]);
        assert_eq!(children[0].1, ProvenanceNode::from("CSVSource"));
    }

    #[test]
    fn test_typed_accessors() {
        let split =
            ObjectProvenance::non_configurable(ObjectKind::SplitDataSource, "SplitDataSource")
                .with_instance(SPLIT_SEED, 7i64)
                .with_instance(SPLIT_TRAIN_PROPORTION, 0.8)
                .with_instance(SPLIT_IS_TRAIN, false)
                .with_instance(SPLIT_SOURCE, csv_source());

        assert_eq!(split.get_long(SPLIT_SEED), Some(7));
        assert_eq!(split.get_double(SPLIT_TRAIN_PROPORTION), Some(0.8));
        assert_eq!(split.get_bool(SPLIT_IS_TRAIN), Some(false));
        assert_eq!(split.get_object(SPLIT_SOURCE).map(|s| s.class_name()), Some("CSVSource"));
        // Wrong type is not coerced
        assert_eq!(split.get_double(SPLIT_SEED), None);
    }

    #[test]
    fn test_innermost_source_unwraps_nested_datasets() {
        let inner = dataset_over(csv_source());
        let outer =
            ObjectProvenance::non_configurable(ObjectKind::Dataset, "MinimumCardinalityDataset")
                .with_instance(SOURCE_PROVENANCE, inner);

        let (source, dataset) = outer.innermost_source().unwrap();
        assert_eq!(source.class_name(), "CSVSource");
        assert_eq!(dataset.class_name(), "MutableDataset");
    }

    #[test]
    fn test_innermost_source_requires_source() {
        let dataset = ObjectProvenance::non_configurable(ObjectKind::Dataset, "MutableDataset");
        assert!(matches!(
            dataset.innermost_source(),
            Err(ReproError::DatasetRecovery(_))
        ));
    }

    #[test]
    fn test_model_provenance_shape() {
        let trainer = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer");
        let provenance = ModelProvenance::new("SVMModel", dataset_over(csv_source()), trainer);

        assert_eq!(provenance.trainer().unwrap().class_name(), "SVMTrainer");
        assert_eq!(provenance.dataset().unwrap().class_name(), "MutableDataset");
        assert!(ModelProvenance::from_object(provenance.object().clone()).is_ok());

        let bare = ObjectProvenance::non_configurable(ObjectKind::Model, "SVMModel");
        assert!(matches!(
            ModelProvenance::from_object(bare),
            Err(ReproError::Extraction { .. })
        ));
    }

    #[test]
    fn test_provenance_serde_round_trip() {
        let trainer = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer")
            .with_configured("c", 1.0)
            .with_instance(TRAIN_INVOCATION_COUNT, 3i64);
        let provenance = ModelProvenance::new("SVMModel", dataset_over(csv_source()), trainer);

        let json = serde_json::to_string(&provenance).unwrap();
        assert_eq!(json, serde_json::to_string(provenance.object()).unwrap());
        let restored: ModelProvenance = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, provenance);
    }

    #[test]
    fn test_malformed_provenance_is_rejected_on_load() {
        let bare = ObjectProvenance::non_configurable(ObjectKind::Model, "SVMModel");
        let json = serde_json::to_string(&bare).unwrap();
        assert!(serde_json::from_str::<ModelProvenance>(&json).is_err());

        let trainer = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer");
        let json = serde_json::to_string(&trainer).unwrap();
        let err = serde_json::from_str::<ModelProvenance>(&json).unwrap_err();
        assert!(err.to_string().contains("expected a model"));
    }
}
