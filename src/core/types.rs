//! Core type definitions shared by data sources, datasets, trainers and models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over `(index, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Keep only the entries whose index passes `keep`, renumbering them with `remap`
    pub fn retain_remapped<F, R>(&self, keep: F, remap: R) -> Self
    where
        F: Fn(usize) -> bool,
        R: Fn(usize) -> usize,
    {
        let (indices, values) = self
            .iter()
            .filter(|&(idx, _)| keep(idx))
            .map(|(idx, value)| (remap(idx), value))
            .unzip();
        Self::new(indices, values)
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Training sample with features and label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// Class label (+1 or -1 for binary classification)
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }
}

/// Format a binary label the way label domains record it
pub fn label_name(label: f64) -> String {
    if label > 0.0 {
        "+1".to_string()
    } else {
        "-1".to_string()
    }
}

/// Observed statistics for one feature of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    pub id: usize,
    pub count: usize,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for FeatureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RealFeature(name={},id={},count={},max={:?},min={:?})",
            self.name, self.id, self.count, self.max, self.min
        )
    }
}

/// Feature domain of a dataset or model, indexed by feature id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap {
    features: Vec<FeatureInfo>,
}

impl FeatureMap {
    /// Build a feature map from feature names and the samples that use them
    ///
    /// Features never observed with a non-zero value are still listed with a zero count.
    pub fn observe(names: &[String], samples: &[Sample]) -> Self {
        let mut features: Vec<FeatureInfo> = names
            .iter()
            .enumerate()
            .map(|(id, name)| FeatureInfo {
                name: name.clone(),
                id,
                count: 0,
                min: 0.0,
                max: 0.0,
            })
            .collect();

        for sample in samples {
            for (idx, value) in sample.features.iter() {
                if idx >= features.len() {
                    continue;
                }
                let info = &mut features[idx];
                if info.count == 0 {
                    info.min = value;
                    info.max = value;
                } else {
                    info.min = info.min.min(value);
                    info.max = info.max.max(value);
                }
                info.count += 1;
            }
        }

        Self { features }
    }

    /// Number of features
    pub fn size(&self) -> usize {
        self.features.len()
    }

    /// Feature by id
    pub fn get(&self, id: usize) -> Option<&FeatureInfo> {
        self.features.get(id)
    }

    /// Iterate over the features in id order
    pub fn iter(&self) -> impl Iterator<Item = &FeatureInfo> {
        self.features.iter()
    }
}

/// Output (label) domain with per-label counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    counts: BTreeMap<String, usize>,
}

impl LabelInfo {
    /// Count the labels of the given samples
    pub fn observe(samples: &[Sample]) -> Self {
        let mut counts = BTreeMap::new();
        for sample in samples {
            *counts.entry(label_name(sample.label)).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of distinct labels
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    /// Number of samples carrying `label`
    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

impl fmt::Display for LabelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelInfo(")?;
        for (i, (label, count)) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{label}={count}")?;
        }
        write!(f, ")")
    }
}

/// Result of the optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b)
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of sweeps over the training set
    pub iterations: usize,
}

/// Configuration for the SMO solver
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance for KKT conditions
    pub epsilon: f64,
    /// Maximum number of sweeps over the training set
    pub max_iterations: usize,
    /// Consecutive sweeps without an update before stopping
    pub max_passes: usize,
    /// Kernel cache size in entries
    pub cache_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 1000,
            max_passes: 5,
            cache_size: 1_000_000,
        }
    }
}
