//! SVM trainer with seeded, replayable randomness
//!
//! The trainer owns a seed and an invocation counter. Call number `n` (counting from the
//! counter's starting value) trains with an RNG derived from the seed and `n`, so a
//! trainer rebuilt with `initial-rng-draws = n` makes exactly the draws the original made
//! on its n-th call.

use crate::core::{Dataset, ReproError, Result, SolverConfig, Trainer};
use crate::kernel::{Kernel, KernelSpec};
use crate::model::Model;
use crate::provenance::{
    ComponentConfig, ModelProvenance, ObjectKind, ObjectProvenance, TRAIN_INVOCATION_COUNT,
};
use crate::registry::ComponentResolver;
use crate::solver::SmoSolver;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 12345;

/// Configuration key restoring the invocation counter of a rebuilt trainer
pub const INITIAL_RNG_DRAWS: &str = "initial-rng-draws";

/// Binary SVM trainer
#[derive(Debug)]
pub struct SvmTrainer {
    config: SolverConfig,
    kernel: KernelSpec,
    seed: u64,
    invocation_count: AtomicU64,
}

impl SvmTrainer {
    pub const CLASS_NAME: &'static str = "SVMTrainer";

    /// Create a trainer with a linear kernel and default parameters
    pub fn new() -> Self {
        Self {
            config: SolverConfig::default(),
            kernel: KernelSpec::Linear,
            seed: DEFAULT_SEED,
            invocation_count: AtomicU64::new(0),
        }
    }

    /// Set the kernel
    pub fn with_kernel(mut self, kernel: KernelSpec) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set maximum number of sweeps
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the number of sweeps without progress before stopping
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.config.max_passes = max_passes;
        self
    }

    /// Set kernel cache size in entries
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Start the invocation counter at `draws`, as if `train` had already been called that often
    pub fn with_initial_rng_draws(mut self, draws: u64) -> Self {
        self.invocation_count = AtomicU64::new(draws);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn kernel(&self) -> &KernelSpec {
        &self.kernel
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rebuild a trainer from its extracted configuration
    pub fn from_config(
        config: &ComponentConfig,
        resolver: &mut dyn ComponentResolver,
    ) -> Result<Self> {
        let mut trainer = SvmTrainer::new();
        if let Some(c) = config.get_f64("c")? {
            trainer = trainer.with_c(c);
        }
        if let Some(epsilon) = config.get_f64("epsilon")? {
            trainer = trainer.with_epsilon(epsilon);
        }
        if let Some(max_iterations) = config.get_usize("max-iterations")? {
            trainer = trainer.with_max_iterations(max_iterations);
        }
        if let Some(max_passes) = config.get_usize("max-passes")? {
            trainer = trainer.with_max_passes(max_passes);
        }
        if let Some(cache_size) = config.get_usize("cache-size")? {
            trainer = trainer.with_cache_size(cache_size);
        }
        // Seeds are recorded as signed longs
        if let Some(seed) = config.get_parsed::<i64>("seed")? {
            trainer = trainer.with_seed(seed as u64);
        }
        if let Some(draws) = config.get_u64(INITIAL_RNG_DRAWS)? {
            trainer = trainer.with_initial_rng_draws(draws);
        }
        if let Some(kernel) = config.get_component("kernel")? {
            trainer = trainer.with_kernel(resolver.resolve_kernel(kernel)?);
        }
        trainer
            .validate()
            .map_err(|e| ReproError::reconstruction(config.name(), e.to_string()))?;
        Ok(trainer)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.config.c > 0.0 && self.config.c.is_finite()) {
            return Err(ReproError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.config.c
            )));
        }
        if !(self.config.epsilon > 0.0) {
            return Err(ReproError::InvalidParameter(format!(
                "Epsilon must be positive, got: {}",
                self.config.epsilon
            )));
        }
        if self.config.max_passes == 0 {
            return Err(ReproError::InvalidParameter(
                "max-passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// RNG for the call that observed `count` prior invocations
    ///
    /// Derived in constant time, so any recorded count can be replayed.
    fn rng_for(&self, count: u64) -> StdRng {
        let stream = count.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut base = StdRng::seed_from_u64(self.seed ^ stream);
        StdRng::seed_from_u64(base.next_u64())
    }

    /// Provenance as it stood when `count` invocations had happened
    fn provenance_at(&self, count: u64) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::Trainer, Self::CLASS_NAME)
            .with_configured("c", self.config.c)
            .with_configured("epsilon", self.config.epsilon)
            .with_configured("max-iterations", self.config.max_iterations as i64)
            .with_configured("max-passes", self.config.max_passes as i64)
            .with_configured("cache-size", self.config.cache_size as i64)
            .with_configured("seed", self.seed as i64)
            .with_configured("kernel", self.kernel.provenance())
            .with_instance(TRAIN_INVOCATION_COUNT, count as i64)
    }
}

impl Default for SvmTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer for SvmTrainer {
    fn train(&self, dataset: &dyn Dataset) -> Result<Model> {
        self.validate()?;
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        let mut rng = self.rng_for(count);

        info!(
            "Training {} on {} samples with {} features (invocation {})",
            self.kernel.class_name(),
            dataset.len(),
            dataset.dim(),
            count
        );

        let samples = dataset.samples();
        let result = SmoSolver::new(&self.kernel, &self.config).solve(samples, &mut rng)?;
        debug!(
            "Solved in {} sweeps with bias {:.6}",
            result.iterations, result.b
        );

        let provenance = ModelProvenance::new(
            Model::CLASS_NAME,
            dataset.provenance(),
            self.provenance_at(count),
        );
        Ok(Model::from_solution(
            self.kernel,
            samples,
            result,
            dataset.feature_map().clone(),
            dataset.label_info().clone(),
            provenance,
        ))
    }

    fn invocation_count(&self) -> u64 {
        self.invocation_count.load(Ordering::SeqCst)
    }

    fn provenance(&self) -> ObjectProvenance {
        self.provenance_at(self.invocation_count())
    }
}
