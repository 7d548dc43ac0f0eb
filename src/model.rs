//! Trained SVM models
//!
//! A model keeps its support vectors with their `alpha * y` coefficients, the kernel it was
//! trained with, the feature and label domains of its training data, and the provenance
//! that records how it was produced.

use crate::core::{
    FeatureMap, LabelInfo, OptimizationResult, Prediction, Sample, SparseVector,
};
use crate::kernel::{Kernel, KernelSpec};
use crate::provenance::ModelProvenance;
use serde::{Deserialize, Serialize};

/// A trained binary SVM classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    kernel: KernelSpec,
    support_vectors: Vec<SparseVector>,
    /// alpha_i * y_i for each support vector
    coefficients: Vec<f64>,
    bias: f64,
    /// Positions of the support vectors in the training set
    support_indices: Vec<usize>,
    feature_map: FeatureMap,
    label_info: LabelInfo,
    provenance: ModelProvenance,
}

impl Model {
    /// Class name recorded in model provenance
    pub const CLASS_NAME: &'static str = "SVMModel";

    /// Build a model from a solved optimization problem
    pub(crate) fn from_solution(
        kernel: KernelSpec,
        samples: &[Sample],
        result: OptimizationResult,
        feature_map: FeatureMap,
        label_info: LabelInfo,
        provenance: ModelProvenance,
    ) -> Self {
        let (support_vectors, coefficients) = result
            .support_vectors
            .iter()
            .map(|&i| (samples[i].features.clone(), result.alpha[i] * samples[i].label))
            .unzip();

        Self {
            kernel,
            support_vectors,
            coefficients,
            bias: result.b,
            support_indices: result.support_vectors,
            feature_map,
            label_info,
            provenance,
        }
    }

    /// Decision function value f(x) = sum_i alpha_i y_i K(x_i, x) + b
    pub fn decision_function(&self, features: &SparseVector) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * self.kernel.compute(sv, features))
            .sum::<f64>()
            + self.bias
    }

    /// Predict a single sample
    pub fn predict(&self, sample: &Sample) -> Prediction {
        let decision_value = self.decision_function(&sample.features);
        let label = if decision_value >= 0.0 { 1.0 } else { -1.0 };
        Prediction::new(label, decision_value)
    }

    /// Predict multiple samples
    pub fn predict_batch(&self, samples: &[Sample]) -> Vec<Prediction> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    pub fn kernel(&self) -> &KernelSpec {
        &self.kernel
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn support_vectors(&self) -> &[SparseVector] {
        &self.support_vectors
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn support_vector_indices(&self) -> &[usize] {
        &self.support_indices
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Feature domain of the training data
    pub fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    /// Label domain of the training data
    pub fn label_info(&self) -> &LabelInfo {
        &self.label_info
    }

    pub fn provenance(&self) -> &ModelProvenance {
        &self.provenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::{ObjectKind, ObjectProvenance, SOURCE_PROVENANCE};

    fn provenance() -> ModelProvenance {
        let source = ObjectProvenance::non_configurable(ObjectKind::DataSource, "InMemorySource");
        let dataset = ObjectProvenance::non_configurable(ObjectKind::Dataset, "MutableDataset")
            .with_instance(SOURCE_PROVENANCE, source);
        let trainer = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer");
        ModelProvenance::new(Model::CLASS_NAME, dataset, trainer)
    }

    fn model() -> Model {
        let samples = vec![
            Sample::new(SparseVector::new(vec![0], vec![1.0]), 1.0),
            Sample::new(SparseVector::new(vec![0], vec![-1.0]), -1.0),
            Sample::new(SparseVector::new(vec![0], vec![5.0]), 1.0),
        ];
        let result = OptimizationResult {
            alpha: vec![0.5, 0.5, 0.0],
            b: 0.0,
            support_vectors: vec![0, 1],
            iterations: 1,
        };
        let names = vec!["x".to_string()];
        Model::from_solution(
            KernelSpec::Linear,
            &samples,
            result,
            FeatureMap::observe(&names, &samples),
            LabelInfo::observe(&samples),
            provenance(),
        )
    }

    #[test]
    fn test_support_vectors_and_coefficients() {
        let model = model();
        assert_eq!(model.n_support_vectors(), 2);
        assert_eq!(model.coefficients(), &[0.5, -0.5]);
        assert_eq!(model.support_vector_indices(), &[0, 1]);
    }

    #[test]
    fn test_decision_function_and_predict() {
        let model = model();
        let x = SparseVector::new(vec![0], vec![2.0]);
        // 0.5 * 2 - 0.5 * -2 = 2
        assert_eq!(model.decision_function(&x), 2.0);

        let negative = Sample::new(SparseVector::new(vec![0], vec![-0.5]), -1.0);
        let prediction = model.predict(&negative);
        assert_eq!(prediction.label, -1.0);
        assert_eq!(prediction.confidence(), 0.5);
    }

    #[test]
    fn test_model_serde_round_trip() {
        let model = model();
        let json = serde_json::to_string(&model).unwrap();
        let restored: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
    }
}
