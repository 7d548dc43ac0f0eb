//! Model evaluation on labelled data

use crate::core::Dataset;
use crate::model::Model;
use serde::Serialize;
use std::fmt;

/// Confusion counts of a binary classifier, +1 being the positive class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Number of evaluated samples
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy:    {:.4}", self.accuracy())?;
        writeln!(f, "Precision:   {:.4}", self.precision())?;
        writeln!(f, "Recall:      {:.4}", self.recall())?;
        writeln!(f, "F1 Score:    {:.4}", self.f1_score())?;
        writeln!(f, "Specificity: {:.4}", self.specificity())?;
        write!(
            f,
            "Confusion:   TP={} TN={} FP={} FN={}",
            self.true_positives, self.true_negatives, self.false_positives, self.false_negatives
        )
    }
}

/// Evaluate `model` on every sample of `dataset`
pub fn evaluate(model: &Model, dataset: &dyn Dataset) -> EvaluationMetrics {
    let mut metrics = EvaluationMetrics::default();
    for sample in dataset.samples() {
        match (model.predict(sample).label > 0.0, sample.label > 0.0) {
            (true, true) => metrics.true_positives += 1,
            (false, false) => metrics.true_negatives += 1,
            (true, false) => metrics.false_positives += 1,
            (false, true) => metrics.false_negatives += 1,
        }
    }
    metrics
}
