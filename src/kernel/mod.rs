//! Kernel functions for SVM
//!
//! Each kernel records its parameters as configured provenance, so a trainer's
//! provenance carries its kernel as a nested component that can be rebuilt on its own.

pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod traits;

pub use self::linear::LinearKernel;
pub use self::polynomial::PolynomialKernel;
pub use self::rbf::RBFKernel;
pub use self::traits::Kernel;

use crate::core::{ReproError, Result, SparseVector};
use crate::provenance::{ComponentConfig, ObjectProvenance};
use serde::{Deserialize, Serialize};

/// Any of the built-in kernels, as stored in a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelSpec {
    Linear,
    Rbf { gamma: f64 },
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
}

impl Default for KernelSpec {
    fn default() -> Self {
        KernelSpec::Linear
    }
}

impl KernelSpec {
    /// RBF kernel with the given gamma
    pub fn rbf(gamma: f64) -> Result<Self> {
        RBFKernel::new(gamma).map(Self::from)
    }

    /// Polynomial kernel with the given degree, gamma and coef0
    pub fn polynomial(degree: u32, gamma: f64, coef0: f64) -> Result<Self> {
        PolynomialKernel::new(degree, gamma, coef0).map(Self::from)
    }

    /// Class name recorded in provenance
    pub fn class_name(&self) -> &'static str {
        match self {
            KernelSpec::Linear => LinearKernel::CLASS_NAME,
            KernelSpec::Rbf { .. } => RBFKernel::CLASS_NAME,
            KernelSpec::Polynomial { .. } => PolynomialKernel::CLASS_NAME,
        }
    }

    /// Rebuild a kernel from an extracted component configuration
    pub fn from_config(config: &ComponentConfig) -> Result<Self> {
        let required = |key: &str| -> Result<f64> {
            config.get_f64(key)?.ok_or_else(|| {
                ReproError::reconstruction(config.name(), format!("missing property '{key}'"))
            })
        };

        match config.class_name() {
            LinearKernel::CLASS_NAME => Ok(KernelSpec::Linear),
            RBFKernel::CLASS_NAME => Self::rbf(required("gamma")?),
            PolynomialKernel::CLASS_NAME => {
                let degree = config.get_parsed::<u32>("degree")?.ok_or_else(|| {
                    ReproError::reconstruction(config.name(), "missing property 'degree'")
                })?;
                Self::polynomial(degree, required("gamma")?, required("coef0")?)
            }
            other => Err(ReproError::reconstruction(
                config.name(),
                format!("unknown kernel class '{other}'"),
            )),
        }
    }

    /// Parse a kernel from command line style arguments
    pub fn parse(name: &str, gamma: f64, degree: u32, coef0: f64) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" => Ok(KernelSpec::Linear),
            "rbf" => Self::rbf(gamma),
            "poly" | "polynomial" => Self::polynomial(degree, gamma, coef0),
            other => Err(ReproError::InvalidParameter(format!(
                "Unknown kernel '{other}', expected linear, rbf or polynomial"
            ))),
        }
    }
}

impl From<LinearKernel> for KernelSpec {
    fn from(_: LinearKernel) -> Self {
        KernelSpec::Linear
    }
}

impl From<RBFKernel> for KernelSpec {
    fn from(kernel: RBFKernel) -> Self {
        KernelSpec::Rbf {
            gamma: kernel.gamma(),
        }
    }
}

impl From<PolynomialKernel> for KernelSpec {
    fn from(kernel: PolynomialKernel) -> Self {
        KernelSpec::Polynomial {
            degree: kernel.degree,
            gamma: kernel.gamma,
            coef0: kernel.coef0,
        }
    }
}

impl Kernel for KernelSpec {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        match *self {
            KernelSpec::Linear => LinearKernel.compute(x, y),
            KernelSpec::Rbf { gamma } => RBFKernel { gamma }.compute(x, y),
            KernelSpec::Polynomial {
                degree,
                gamma,
                coef0,
            } => PolynomialKernel {
                degree,
                gamma,
                coef0,
            }
            .compute(x, y),
        }
    }

    fn provenance(&self) -> ObjectProvenance {
        match *self {
            KernelSpec::Linear => LinearKernel.provenance(),
            KernelSpec::Rbf { gamma } => RBFKernel { gamma }.provenance(),
            KernelSpec::Polynomial {
                degree,
                gamma,
                coef0,
            } => PolynomialKernel {
                degree,
                gamma,
                coef0,
            }
            .provenance(),
        }
    }
}
