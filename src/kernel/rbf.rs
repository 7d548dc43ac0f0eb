//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::{ReproError, Result, SparseVector};
use crate::kernel::Kernel;
use crate::provenance::{ObjectKind, ObjectProvenance};

/// RBF kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// High gamma lets only close points influence each other, low gamma widens the reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RBFKernel {
    pub(crate) gamma: f64,
}

impl RBFKernel {
    pub const CLASS_NAME: &'static str = "RBFKernel";

    /// Create a new RBF kernel; gamma must be positive and finite
    pub fn new(gamma: f64) -> Result<Self> {
        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(ReproError::InvalidParameter(format!(
                "Gamma must be positive, got: {gamma}"
            )));
        }
        Ok(Self { gamma })
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (-self.gamma * squared_euclidean_distance(x, y)).exp()
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::Component, Self::CLASS_NAME)
            .with_configured("gamma", self.gamma)
    }
}

/// Squared Euclidean distance between two sparse vectors in one merge pass
fn squared_euclidean_distance(x: &SparseVector, y: &SparseVector) -> f64 {
    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.indices.len() && j < y.indices.len() {
        let x_idx = x.indices[i];
        let y_idx = y.indices[j];

        if x_idx == y_idx {
            let diff = x.values[i] - y.values[j];
            distance_sq += diff * diff;
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            // y is implicitly 0 here
            distance_sq += x.values[i] * x.values[i];
            i += 1;
        } else {
            distance_sq += y.values[j] * y.values[j];
            j += 1;
        }
    }

    distance_sq += x.values[i..].iter().map(|v| v * v).sum::<f64>();
    distance_sq += y.values[j..].iter().map(|v| v * v).sum::<f64>();

    distance_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rbf_identical_vectors() {
        let kernel = RBFKernel::new(0.5).unwrap();
        let x = SparseVector::new(vec![0, 3], vec![1.0, -2.0]);
        assert_relative_eq!(kernel.compute(&x, &x), 1.0);
    }

    #[test]
    fn test_rbf_known_value() {
        let kernel = RBFKernel::new(0.5).unwrap();
        let x = SparseVector::new(vec![0], vec![1.0]);
        let y = SparseVector::new(vec![1], vec![1.0]);

        // ||x - y||² = 2, exp(-0.5 * 2) = e^-1
        assert_relative_eq!(kernel.compute(&x, &y), (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_rbf_rejects_bad_gamma() {
        assert!(RBFKernel::new(0.0).is_err());
        assert!(RBFKernel::new(-1.0).is_err());
        assert!(RBFKernel::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rbf_provenance_records_gamma() {
        let provenance = RBFKernel::new(0.25).unwrap().provenance();
        assert_eq!(provenance.get_double("gamma"), Some(0.25));
    }
}
