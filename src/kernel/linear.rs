//! Linear kernel implementation

use crate::core::SparseVector;
use crate::kernel::Kernel;
use crate::provenance::{ObjectKind, ObjectProvenance};
use std::cmp::Ordering;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearKernel;

impl LinearKernel {
    pub const CLASS_NAME: &'static str = "LinearKernel";

    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        dot_product_sparse(x, y)
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::Component, Self::CLASS_NAME)
    }
}

/// Dot product of two sparse vectors, merging their sorted index lists
pub(crate) fn dot_product_sparse(x: &SparseVector, y: &SparseVector) -> f64 {
    let mut left = x.iter().peekable();
    let mut right = y.iter().peekable();
    let mut sum = 0.0;

    while let (Some(&(i, a)), Some(&(j, b))) = (left.peek(), right.peek()) {
        match i.cmp(&j) {
            Ordering::Equal => {
                sum += a * b;
                left.next();
                right.next();
            }
            Ordering::Less => {
                left.next();
            }
            Ordering::Greater => {
                right.next();
            }
        }
    }

    sum
}
