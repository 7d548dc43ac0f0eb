//! Model serialization and persistence
//!
//! Models are stored as pretty-printed JSON, wrapped in an envelope carrying the format
//! version and the time the file was written. The full provenance travels with the model,
//! so a saved model can be reproduced later.

use crate::core::{ReproError, Result};
use crate::model::Model;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Current model file format
pub const FORMAT_VERSION: u32 = 1;

/// On-disk representation of a model
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelFile {
    pub format_version: u32,
    /// Library version that wrote the file
    pub library_version: String,
    pub saved_at: DateTime<Utc>,
    pub model: Model,
}

/// Save a model to `path`
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let envelope = ModelFile {
        format_version: FORMAT_VERSION,
        library_version: crate::VERSION.to_string(),
        saved_at: Utc::now(),
        model: model.clone(),
    };
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), &envelope)
        .map_err(|e| ReproError::SerializationError(e.to_string()))?;
    debug!("Saved model to {}", path.as_ref().display());
    Ok(())
}

/// Load the model file at `path`, checking its format version
pub fn load_model_file<P: AsRef<Path>>(path: P) -> Result<ModelFile> {
    let file = File::open(path)?;
    let envelope: ModelFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ReproError::SerializationError(e.to_string()))?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(ReproError::SerializationError(format!(
            "unsupported model format version {} (expected {FORMAT_VERSION})",
            envelope.format_version
        )));
    }
    Ok(envelope)
}

/// Load a model from `path`
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    load_model_file(path).map(|envelope| envelope.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sample, SparseVector, Trainer};
    use crate::data::{InMemorySource, MutableDataset};
    use crate::provenance::{ObjectKind, ObjectProvenance};
    use crate::trainer::SvmTrainer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn model() -> Model {
        let samples = vec![
            Sample::new(SparseVector::new(vec![0], vec![2.0]), 1.0),
            Sample::new(SparseVector::new(vec![0], vec![-2.0]), -1.0),
            Sample::new(SparseVector::new(vec![0], vec![1.5]), 1.0),
            Sample::new(SparseVector::new(vec![0], vec![-1.5]), -1.0),
        ];
        let source = InMemorySource::new(vec!["x".to_string()], samples);
        let dataset = MutableDataset::from_source(&source).unwrap();
        SvmTrainer::new().train(&dataset).unwrap()
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let model = model();
        let file = NamedTempFile::new().expect("Failed to create temp file");

        save_model(&model, file.path())?;
        let envelope = load_model_file(file.path())?;

        assert_eq!(envelope.format_version, FORMAT_VERSION);
        assert_eq!(envelope.library_version, crate::VERSION);
        assert_eq!(envelope.model, model);
        Ok(())
    }

    #[test]
    fn test_rejects_other_format_versions() {
        let model = model();
        let file = NamedTempFile::new().unwrap();
        save_model(&model, file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["format_version"] = serde_json::json!(99);
        std::fs::write(file.path(), value.to_string()).unwrap();

        assert!(matches!(
            load_model(file.path()),
            Err(ReproError::SerializationError(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_provenance() {
        let model = model();
        let file = NamedTempFile::new().unwrap();
        save_model(&model, file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let bare = ObjectProvenance::non_configurable(ObjectKind::Model, Model::CLASS_NAME);
        value["model"]["provenance"] = serde_json::to_value(&bare).unwrap();
        std::fs::write(file.path(), value.to_string()).unwrap();

        assert!(matches!(
            load_model(file.path()),
            Err(ReproError::SerializationError(_))
        ));
    }

    #[test]
    fn test_garbage_and_missing_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        assert!(matches!(
            load_model(file.path()),
            Err(ReproError::SerializationError(_))
        ));
        assert!(matches!(
            load_model("/nonexistent/model.json"),
            Err(ReproError::IoError(_))
        ));
    }
}
