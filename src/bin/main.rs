//! rsvm-repro Command Line Interface
//!
//! Train SVM models that carry their provenance, inspect them, reproduce them from the
//! recorded provenance and diff the provenance of two models.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use rsvm_repro::core::{DataSource, Dataset, ReproError, Result, Trainer};
use rsvm_repro::persistence::load_model_file;
use rsvm_repro::provenance::{diff_provenance_with_labels, DiffLabels};
use rsvm_repro::{
    evaluate, load_model, save_model, CSVSource, Catalog, KernelSpec, LibSVMSource,
    MinimumCardinalityDataset, Model, MutableDataset, Reproducer, SvmTrainer,
    TrainTestSplitter,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rsvm-repro")]
#[command(about = "SVM training with provenance capture and reproduction")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "RSVM Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new SVM model and record its provenance
    Train(TrainArgs),
    /// Evaluate a model on test data
    Evaluate(EvaluateArgs),
    /// Display model information and provenance
    Info(InfoArgs),
    /// Retrain a model from its recorded provenance
    Reproduce(ReproduceArgs),
    /// Show the provenance differences between two models
    Diff(DiffArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Tolerance for the KKT conditions
    #[arg(short, long, default_value = "0.001")]
    epsilon: f64,

    /// Maximum number of solver iterations
    #[arg(long, default_value = "1000")]
    max_iterations: usize,

    /// Passes without change before the solver stops
    #[arg(long, default_value = "5")]
    max_passes: usize,

    /// Kernel cache size (entries)
    #[arg(long, default_value = "1000000")]
    cache_size: usize,

    /// Seed of the trainer's random number generator
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Kernel: linear, rbf, or polynomial
    #[arg(short, long, default_value = "linear")]
    kernel: String,

    /// Gamma for the rbf and polynomial kernels
    #[arg(long, default_value = "1.0")]
    gamma: f64,

    /// Degree of the polynomial kernel
    #[arg(long, default_value = "3")]
    degree: u32,

    /// Independent term of the polynomial kernel
    #[arg(long, default_value = "0.0")]
    coef0: f64,

    /// Train on a random split of the data with this training proportion
    #[arg(long)]
    train_proportion: Option<f64>,

    /// Seed of the train/test split
    #[arg(long, default_value = "1")]
    split_seed: u64,

    /// Drop features seen in fewer than this many samples
    #[arg(long)]
    min_cardinality: Option<usize>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    #[arg(short, long)]
    model: PathBuf,

    /// Also print the full provenance as JSON
    #[arg(long)]
    provenance: bool,
}

#[derive(Args)]
struct ReproduceArgs {
    /// Model file whose provenance is replayed
    #[arg(short, long)]
    model: PathBuf,

    /// Read the training data from this path instead of the recorded one
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Save the reproduced model here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the provenance diff between the original and reproduced model
    #[arg(long)]
    diff: bool,

    /// Skip checking the reproduced model against the original
    #[arg(long)]
    no_validate: bool,
}

#[derive(Args)]
struct DiffArgs {
    /// Original model file
    original: PathBuf,

    /// Model file compared against the original
    other: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
        Commands::Reproduce(args) => reproduce_command(args),
        Commands::Diff(args) => diff_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Loading training data from: {:?}", args.data);
    let source = load_source(&args.data, &args.format)?;

    let kernel = KernelSpec::parse(&args.kernel, args.gamma, args.degree, args.coef0)?;
    let trainer = SvmTrainer::new()
        .with_kernel(kernel)
        .with_c(args.c)
        .with_epsilon(args.epsilon)
        .with_max_iterations(args.max_iterations)
        .with_max_passes(args.max_passes)
        .with_cache_size(args.cache_size)
        .with_seed(args.seed);

    let mut train_source = source;
    let mut test_source: Option<Arc<dyn DataSource>> = None;
    if let Some(proportion) = args.train_proportion {
        let splitter = TrainTestSplitter::new(train_source, proportion, args.split_seed)?;
        info!(
            "Split data with proportion {proportion} (seed {})",
            args.split_seed
        );
        let test: Arc<dyn DataSource> = Arc::new(splitter.test());
        train_source = Arc::new(splitter.train());
        test_source = Some(test);
    }

    let dataset = build_dataset(train_source.as_ref(), args.min_cardinality)?;
    info!(
        "Training {} kernel SVM on {} samples with {} features",
        trainer.kernel().class_name(),
        dataset.len(),
        dataset.dim()
    );

    let start_time = std::time::Instant::now();
    let model = trainer.train(dataset.as_ref())?;
    let training_time = start_time.elapsed();

    save_model(&model, &args.output)?;

    println!("Training completed successfully!");
    println!("Training time: {:.2}s", training_time.as_secs_f64());
    println!("Support vectors: {}", model.n_support_vectors());
    println!("Bias: {:.6}", model.bias());
    println!("Model saved to: {:?}", args.output);

    if let Some(test_source) = test_source {
        if test_source.is_empty() {
            warn!("Test split is empty, skipping held-out evaluation");
        } else {
            let test = MutableDataset::from_source(test_source.as_ref())?;
            let metrics = evaluate(&model, &test);
            println!("Held-out accuracy: {:.2}%", metrics.accuracy() * 100.0);
        }
    }

    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;

    info!("Loading test data from: {:?}", args.data);
    let source = load_source(&args.data, &args.format)?;
    let dataset = MutableDataset::from_source(source.as_ref())?;

    info!(
        "Evaluating model with {} support vectors",
        model.n_support_vectors()
    );
    let metrics = evaluate(&model, &dataset);

    println!("=== Model Evaluation ===");
    print_summary(&model);

    println!("\nTest Results:");
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

    if args.detailed {
        println!("\nDetailed Metrics:");
        println!("{metrics}");
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let file = load_model_file(&args.model)?;

    println!("Format version: {}", file.format_version);
    println!("Library version: {}", file.library_version);
    println!("Saved at: {}", file.saved_at.to_rfc3339());
    print_summary(&file.model);

    if args.provenance {
        let json = serde_json::to_string_pretty(file.model.provenance())
            .map_err(|e| ReproError::SerializationError(e.to_string()))?;
        println!("\nProvenance:");
        println!("{json}");
    }

    Ok(())
}

fn reproduce_command(args: ReproduceArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let original = load_model(&args.model)?;

    let catalog = Arc::new(Catalog::standard());
    let mut reproducer = Reproducer::from_model(original.clone(), catalog)?;

    if let Some(path) = &args.data_path {
        let changed = reproducer.relocate_data(&path.to_string_lossy())?;
        if changed == 0 {
            warn!("No recorded data source reads from a path; --data-path ignored");
        }
    }

    let reproduced = if args.no_validate {
        reproducer.reproduce_from_provenance()?
    } else {
        reproducer.reproduce_from_model()?
    };

    println!("Reproduction completed ({:?})", reproducer.state());
    println!("Support vectors: {}", reproduced.n_support_vectors());
    println!("Bias: {:.6}", reproduced.bias());

    if let Some(output) = &args.output {
        save_model(&reproduced, output)?;
        println!("Reproduced model saved to: {output:?}");
    }

    if args.diff {
        println!("\nProvenance diff:");
        println!("{}", reproducer.diff_against(&reproduced)?);
    }

    Ok(())
}

fn diff_command(args: DiffArgs) -> Result<()> {
    let original = load_model(&args.original)?;
    let other = load_model(&args.other)?;

    let labels = DiffLabels::new(
        args.original.to_string_lossy(),
        args.other.to_string_lossy(),
    );
    let report = diff_provenance_with_labels(original.provenance(), other.provenance(), &labels)?;
    println!("{report}");

    Ok(())
}

fn print_summary(model: &Model) {
    println!("Model: {}", model.provenance().class_name());
    println!("  Kernel: {}", model.kernel().class_name());
    println!("  Support vectors: {}", model.n_support_vectors());
    println!("  Bias: {:.6}", model.bias());
    println!("  Features: {}", model.feature_map().size());
    println!("  Labels: {}", model.label_info());
}

fn load_source(path: &Path, format: &str) -> Result<Arc<dyn DataSource>> {
    let format = if format == "auto" {
        detect_format(path)
    } else {
        format.to_string()
    };

    match format.as_str() {
        "libsvm" => Ok(Arc::new(LibSVMSource::from_file(path)?)),
        "csv" => Ok(Arc::new(CSVSource::from_file(path)?)),
        _ => Err(ReproError::InvalidParameter(format!(
            "Unsupported format: {format}"
        ))),
    }
}

fn build_dataset(
    source: &dyn DataSource,
    min_cardinality: Option<usize>,
) -> Result<Box<dyn Dataset>> {
    let dataset = MutableDataset::from_source(source)?;
    match min_cardinality {
        Some(min) => {
            let filtered = MinimumCardinalityDataset::new(&dataset, min)?;
            info!(
                "Removed {} features seen in fewer than {min} samples",
                filtered.removed_features()
            );
            Ok(Box::new(filtered))
        }
        None => Ok(Box::new(dataset)),
    }
}

fn detect_format(path: &Path) -> String {
    if let Some(ext) = path.extension() {
        match ext.to_str() {
            Some("csv") => "csv".to_string(),
            Some("libsvm") | Some("svm") => "libsvm".to_string(),
            _ => {
                warn!("Unknown file extension, assuming LibSVM format");
                "libsvm".to_string()
            }
        }
    } else {
        warn!("No file extension, assuming LibSVM format");
        "libsvm".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(detect_format(&PathBuf::from("test.csv")), "csv");
        assert_eq!(detect_format(&PathBuf::from("test.libsvm")), "libsvm");
        assert_eq!(detect_format(&PathBuf::from("test.svm")), "libsvm");
        assert_eq!(detect_format(&PathBuf::from("test")), "libsvm");
    }

    #[test]
    fn test_cli_parses_reproduce() {
        let cli = Cli::try_parse_from([
            "rsvm-repro",
            "reproduce",
            "--model",
            "m.json",
            "--data-path",
            "moved.csv",
            "--diff",
        ])
        .unwrap();
        match cli.command {
            Commands::Reproduce(args) => {
                assert_eq!(args.model, PathBuf::from("m.json"));
                assert_eq!(args.data_path, Some(PathBuf::from("moved.csv")));
                assert!(args.diff);
                assert!(!args.no_validate);
            }
            _ => panic!("expected reproduce"),
        }
    }
}
