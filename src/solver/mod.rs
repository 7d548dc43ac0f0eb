//! SVM solver implementations
//!
//! The trainer solves the SVM dual with a Sequential Minimal Optimization (SMO) solver
//! whose second-variable choice is driven by the trainer's seeded RNG.

pub mod smo;

pub use self::smo::SmoSolver;
