//! Integration tests for the rsvm-repro library
//!
//! These tests verify end-to-end functionality across multiple modules:
//! loading data, training, persisting and evaluating models.

use approx::assert_relative_eq;
use rsvm_repro::core::{Dataset, Trainer};
use rsvm_repro::persistence::{load_model_file, FORMAT_VERSION};
use rsvm_repro::provenance::{ObjectKind, TRAIN_INVOCATION_COUNT};
use rsvm_repro::{
    evaluate, load_model, save_model, CSVSource, KernelSpec, LibSVMSource, MutableDataset,
    Sample, SparseVector, SvmTrainer,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn libsvm_file() -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    // Classic linearly separable dataset
    writeln!(temp_file, "+1 1:2.0 2:1.0").expect("Failed to write");
    writeln!(temp_file, "+1 1:1.8 2:1.1").expect("Failed to write");
    writeln!(temp_file, "+1 1:2.2 2:0.9").expect("Failed to write");
    writeln!(temp_file, "-1 1:-2.0 2:-1.0").expect("Failed to write");
    writeln!(temp_file, "-1 1:-1.8 2:-1.1").expect("Failed to write");
    writeln!(temp_file, "-1 1:-2.2 2:-0.9").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");
    temp_file
}

/// Test complete workflow: data loading -> training -> saving -> evaluation
#[test]
fn test_complete_workflow_libsvm() {
    let data = libsvm_file();
    let source = LibSVMSource::from_file(data.path()).expect("Failed to load dataset");
    let dataset = MutableDataset::from_source(&source).expect("Failed to build dataset");

    let model = SvmTrainer::new()
        .with_c(1.0)
        .with_epsilon(0.001)
        .with_max_iterations(1000)
        .train(&dataset)
        .expect("Training should succeed");

    assert!(model.n_support_vectors() > 0, "Should have support vectors");
    assert!(
        model.n_support_vectors() <= 6,
        "Should not have more support vectors than samples"
    );

    let metrics = evaluate(&model, &dataset);
    assert_eq!(metrics.total(), 6);
    assert!(
        metrics.accuracy() >= 0.8,
        "Accuracy should be at least 80% for linearly separable data, got: {}",
        metrics.accuracy()
    );
    assert!(metrics.precision() >= 0.8);
    assert!(metrics.recall() >= 0.8);

    let dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = dir.path().join("model.json");
    save_model(&model, &model_path).expect("Saving should succeed");
    let loaded = load_model(&model_path).expect("Loading should succeed");

    assert_eq!(loaded, model);
    for sample in dataset.samples() {
        assert_relative_eq!(
            loaded.decision_function(&sample.features),
            model.decision_function(&sample.features),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_csv_workflow_with_rbf_kernel() {
    let mut temp_file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    writeln!(temp_file, "feature1,feature2,label").expect("Failed to write");
    writeln!(temp_file, "2.0,1.0,1").expect("Failed to write");
    writeln!(temp_file, "-2.0,-1.0,-1").expect("Failed to write");
    writeln!(temp_file, "1.5,0.8,1").expect("Failed to write");
    writeln!(temp_file, "-1.5,-0.8,-1").expect("Failed to write");
    writeln!(temp_file, "1.8,0.9,1").expect("Failed to write");
    writeln!(temp_file, "-1.8,-0.9,-1").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");

    let source = CSVSource::from_file(temp_file.path()).expect("Failed to load CSV");
    let dataset = MutableDataset::from_source(&source).expect("Failed to build dataset");
    assert_eq!(dataset.feature_map().get(0).unwrap().name, "feature1");

    let kernel = KernelSpec::rbf(0.5).expect("Valid gamma");
    let model = SvmTrainer::new()
        .with_kernel(kernel)
        .train(&dataset)
        .expect("Training should succeed");

    assert_eq!(model.kernel(), &kernel);
    assert!(evaluate(&model, &dataset).accuracy() >= 0.8);

    let trainer = model.provenance().trainer().unwrap();
    let recorded_kernel = trainer.get_object("kernel").expect("Kernel should be recorded");
    assert_eq!(recorded_kernel.class_name(), "RBFKernel");
    assert_eq!(recorded_kernel.get_double("gamma"), Some(0.5));
}

#[test]
fn test_saved_model_keeps_provenance() {
    let data = libsvm_file();
    let source = LibSVMSource::from_file(data.path()).expect("Failed to load dataset");
    let dataset = MutableDataset::from_source(&source).expect("Failed to build dataset");
    let trainer = SvmTrainer::new().with_seed(77);
    trainer.train(&dataset).expect("Training should succeed");
    let model = trainer.train(&dataset).expect("Training should succeed");

    let saved = NamedTempFile::new().expect("Failed to create temp file");
    save_model(&model, saved.path()).expect("Saving should succeed");
    let file = load_model_file(saved.path()).expect("Loading should succeed");

    assert_eq!(file.format_version, FORMAT_VERSION);
    assert_eq!(file.library_version, rsvm_repro::VERSION);
    let provenance = file.model.provenance();
    assert_eq!(provenance, model.provenance());

    let trainer = provenance.trainer().unwrap();
    assert_eq!(trainer.kind(), ObjectKind::Trainer);
    assert_eq!(trainer.get_long("seed"), Some(77));
    assert_eq!(trainer.get_long(TRAIN_INVOCATION_COUNT), Some(1));

    let dataset = provenance.dataset().unwrap();
    let (leaf, _) = dataset.innermost_source().unwrap();
    assert_eq!(leaf.class_name(), "LibSVMSource");
    assert_eq!(
        leaf.get_str("path").map(str::to_string),
        Some(data.path().to_string_lossy().into_owned())
    );
}

#[test]
fn test_training_rejects_single_class() {
    let samples = vec![
        Sample::new(SparseVector::new(vec![0], vec![1.0]), 1.0),
        Sample::new(SparseVector::new(vec![0], vec![2.0]), 1.0),
    ];
    let source = rsvm_repro::InMemorySource::new(vec!["x".to_string()], samples);
    let dataset = MutableDataset::from_source(&source).expect("Failed to build dataset");
    let trainer = SvmTrainer::new();

    assert!(trainer.train(&dataset).is_err());
    assert_eq!(trainer.invocation_count(), 1);
}

#[test]
fn test_load_rejects_garbage() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "not a model").expect("Failed to write");
    file.flush().expect("Failed to flush");

    assert!(load_model(file.path()).is_err());
    assert!(load_model("/nonexistent/model.json").is_err());
}
