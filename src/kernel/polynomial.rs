//! Polynomial kernel implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d

use crate::core::{ReproError, Result, SparseVector};
use crate::kernel::linear::dot_product_sparse;
use crate::kernel::Kernel;
use crate::provenance::{ObjectKind, ObjectProvenance};

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialKernel {
    /// Degree of the polynomial
    pub degree: u32,
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
}

impl PolynomialKernel {
    pub const CLASS_NAME: &'static str = "PolynomialKernel";

    /// Creates a new polynomial kernel
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Result<Self> {
        if degree == 0 {
            return Err(ReproError::InvalidParameter(
                "Polynomial degree must be positive".to_string(),
            ));
        }
        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(ReproError::InvalidParameter(format!(
                "Gamma must be positive, got: {gamma}"
            )));
        }
        Ok(Self {
            degree,
            gamma,
            coef0,
        })
    }

    /// Quadratic kernel: (γ * <x,y> + 1)²
    pub fn quadratic(gamma: f64) -> Result<Self> {
        Self::new(2, gamma, 1.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        let base = self.gamma * dot_product_sparse(x, y) + self.coef0;
        base.powi(self.degree as i32)
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::Component, Self::CLASS_NAME)
            .with_configured("degree", i64::from(self.degree))
            .with_configured("gamma", self.gamma)
            .with_configured("coef0", self.coef0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_kernel() {
        let kernel = PolynomialKernel::quadratic(1.0).unwrap();
        let x = SparseVector::new(vec![0, 1], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![0, 1], vec![3.0, 4.0]);

        // (11 + 1)^2
        assert_eq!(kernel.compute(&x, &y), 144.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(PolynomialKernel::new(0, 1.0, 1.0).is_err());
        assert!(PolynomialKernel::new(2, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_provenance_fields() {
        let provenance = PolynomialKernel::new(3, 0.5, 1.0).unwrap().provenance();
        assert_eq!(provenance.get_long("degree"), Some(3));
        assert_eq!(provenance.get_double("gamma"), Some(0.5));
        assert_eq!(provenance.get_double("coef0"), Some(1.0));
    }
}
