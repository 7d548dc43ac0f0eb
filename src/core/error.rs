//! Error types for training, reproduction and provenance diffing

use std::fmt;
use thiserror::Error;

/// Which aspect of a reproduced model diverged from the original
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationKind {
    /// No original model was supplied to validate against
    MissingModel,
    /// The feature maps have a different number of features
    FeatureMapSize { original: usize, reproduced: usize },
    /// The feature at `index` renders differently in the two models
    FeatureIdentity { index: usize },
    /// The label domains differ
    OutputDomain,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::MissingModel => write!(f, "missing-model"),
            ValidationKind::FeatureMapSize {
                original,
                reproduced,
            } => write!(
                f,
                "feature-map-size (original {original}, reproduced {reproduced})"
            ),
            ValidationKind::FeatureIdentity { index } => {
                write!(f, "feature-identity (index {index})")
            }
            ValidationKind::OutputDomain => write!(f, "output-domain"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReproError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Extraction error at '{path}': {message}")]
    Extraction { path: String, message: String },

    #[error("Trainer recovery failed: {0}")]
    TrainerRecovery(String),

    #[error("Dataset recovery failed: {0}")]
    DatasetRecovery(String),

    #[error("Reconstruction of component '{component}' failed: {message}")]
    Reconstruction { component: String, message: String },

    #[error("Reproduced model failed validation: {kind}")]
    Validation { kind: ValidationKind },

    #[error("Unsupported diff at '{path}': {message}")]
    UnsupportedDiff { path: String, message: String },
}

impl ReproError {
    pub(crate) fn reconstruction(component: &str, message: impl Into<String>) -> Self {
        ReproError::Reconstruction {
            component: component.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReproError>;
