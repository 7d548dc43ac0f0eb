//! CSV data source
//!
//! - The last column is the label
//! - All other columns are features
//! - The first row may hold column names (detected automatically)

use super::{binarize_label, default_feature_name};
use crate::core::{DataSource, ReproError, Result, Sample, SparseVector};
use crate::provenance::{ComponentConfig, ObjectKind, ObjectProvenance};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Samples read from a CSV file, configurable by its path
#[derive(Debug, Clone)]
pub struct CSVSource {
    path: PathBuf,
    feature_names: Vec<String>,
    samples: Vec<Sample>,
}

impl CSVSource {
    pub const CLASS_NAME: &'static str = "CSVSource";

    /// Load a CSV file
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

    /// Parse CSV content into feature names and samples
    pub fn parse<R: BufRead>(reader: R) -> Result<(Vec<String>, Vec<Sample>)> {
        let mut header: Option<Vec<String>> = None;
        let mut width: Option<usize> = None;
        let mut samples = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if width.is_none() && header.is_none() && is_header_line(line) {
                let names: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
                width = Some(names.len());
                header = Some(names);
                continue;
            }

            let (sample, columns) = parse_data_line(line, width)
                .map_err(|e| ReproError::ParseError(format!("line {}: {e}", line_num + 1)))?;
            if width.is_none() {
                width = Some(columns);
            }
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(ReproError::EmptyDataset);
        }

        let n_features = width.unwrap_or(1) - 1;
        let feature_names = match header {
            Some(mut names) => {
                names.truncate(n_features);
                names
            }
            None => (0..n_features).map(default_feature_name).collect(),
        };
        Ok((feature_names, samples))
    }
}

impl DataSource for CSVSource {
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

/// A line is a header when most feature columns fail to parse as numbers
fn is_header_line(line: &str) -> bool {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        return false;
    }

    let feature_columns = fields.len() - 1;
    let non_numeric = fields
        .iter()
        .take(feature_columns)
        .filter(|field| field.trim().parse::<f64>().is_err())
        .count();

    non_numeric * 2 > feature_columns
}

/// Parse one data line, returning the sample and the number of columns
fn parse_data_line(
    line: &str,
    expected_width: Option<usize>,
) -> std::result::Result<(Sample, usize), String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 2 {
        return Err(format!("too few fields: {line}"));
    }
    if let Some(expected) = expected_width {
        if fields.len() != expected {
            return Err(format!(
                "expected {expected} columns, found {}",
                fields.len()
            ));
        }
    }

    let (feature_fields, label_field) = fields.split_at(fields.len() - 1);
    let label = label_field[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid label: {}", label_field[0]))?;

    let mut indices = Vec::new();
    let mut values = Vec::new();
    for (idx, field) in feature_fields.iter().enumerate() {
        let value = field
            .parse::<f64>()
            .map_err(|_| format!("invalid feature value at column {}: {field}", idx + 1))?;
        // Only non-zero values are stored
        if value != 0.0 {
            indices.push(idx);
            values.push(value);
        }
    }

    Ok((
        Sample::new(SparseVector::new(indices, values), binarize_label(label)),
        fields.len(),
    ))
}
