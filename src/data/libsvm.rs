//! LibSVM format data source
//!
//! Each line is `label index:value index:value ...` with 1-based feature indices:
//!
//! ```text
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//! ```

use super::{binarize_label, default_feature_name};
use crate::core::{DataSource, ReproError, Result, Sample, SparseVector};
use crate::provenance::{ComponentConfig, ObjectKind, ObjectProvenance};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Samples read from a LibSVM file, configurable by its path
#[derive(Debug, Clone)]
pub struct LibSVMSource {
    path: PathBuf,
    feature_names: Vec<String>,
    samples: Vec<Sample>,
}

impl LibSVMSource {
    pub const CLASS_NAME: &'static str = "LibSVMSource";

    /// Load a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let (feature_names, samples) = Self::parse(BufReader::new(file))?;
        debug!(
            "Loaded {} samples with {} features from {}",
            samples.len(),
            feature_names.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            feature_names,
            samples,
        })
    }

    /// Rebuild from an extracted configuration; `path` is required
    pub fn from_config(config: &ComponentConfig) -> Result<Self> {
        Self::from_file(config.require_str("path")?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse LibSVM content into feature names and samples
    ///
    /// The feature count is one past the largest index seen.
    pub fn parse<R: BufRead>(reader: R) -> Result<(Vec<String>, Vec<Sample>)> {
        let mut samples = Vec::new();
        let mut dimensions = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sample = parse_line(line).map_err(|e| {
                ReproError::ParseError(format!("Error parsing line {}: {e}", line_num + 1))
            })?;
            if let Some(&max_idx) = sample.features.indices.last() {
                dimensions = dimensions.max(max_idx + 1);
            }
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(ReproError::EmptyDataset);
        }

        Ok(((0..dimensions).map(default_feature_name).collect(), samples))
    }
}

impl DataSource for LibSVMSource {
    fn samples(&self) -> &[Sample] {
        &self.samples
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn provenance(&self) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::DataSource, Self::CLASS_NAME)
            .with_configured("path", self.path.to_string_lossy().into_owned())
            .with_instance("num-examples", self.samples.len() as i64)
    }
}

/// Parse a single line in libsvm format
fn parse_line(line: &str) -> std::result::Result<Sample, String> {
    let mut parts = line.split_whitespace();
    let label_str = parts.next().ok_or("empty line")?;
    let label = label_str
        .parse::<f64>()
        .map_err(|_| format!("invalid label: {label_str}"))?;

    let mut indices = Vec::new();
    let mut values = Vec::new();
    for feature in parts {
        let (index, value) = feature
            .split_once(':')
            .ok_or_else(|| format!("invalid feature format: {feature}"))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| format!("invalid feature index: {index}"))?;
        let value = value
            .parse::<f64>()
            .map_err(|_| format!("invalid feature value: {value}"))?;
        if index == 0 {
            return Err("feature indices are 1-based, found 0".to_string());
        }
        indices.push(index - 1);
        values.push(value);
    }

    Ok(Sample::new(
        SparseVector::new(indices, values),
        binarize_label(label),
    ))
}
