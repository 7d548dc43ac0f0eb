//! Kernel trait definition

use crate::core::SparseVector;
use crate::provenance::ObjectProvenance;

/// Kernel function trait
///
/// A kernel function K(x, y) must satisfy Mercer's condition to be valid for SVM.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;

    /// Configured provenance of the kernel, enough to rebuild it
    fn provenance(&self) -> ObjectProvenance;
}
