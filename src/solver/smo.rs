//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Platt's SMO in its randomized form: every sample that violates the KKT conditions is
//! paired with a second sample drawn from the supplied RNG, and the pair is optimized
//! analytically. Training stops after `max_passes` consecutive sweeps without an update
//! or after `max_iterations` sweeps. Given the same samples, configuration and RNG state
//! the result is identical, which is what makes retraining reproducible.

use crate::cache::KernelMatrix;
use crate::core::{OptimizationResult, ReproError, Result, Sample, SolverConfig};
use crate::kernel::Kernel;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

/// Minimum change of an alpha for a step to count as progress
const MIN_ALPHA_STEP: f64 = 1e-5;

/// SMO solver for SVM optimization
pub struct SmoSolver<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    config: &'a SolverConfig,
}

impl<'a, K: Kernel + ?Sized> SmoSolver<'a, K> {
    /// Create a new SMO solver with the given kernel and configuration
    pub fn new(kernel: &'a K, config: &'a SolverConfig) -> Self {
        Self { kernel, config }
    }

    /// Solve the dual problem for `samples`, drawing second variables from `rng`
    pub fn solve(&self, samples: &[Sample], rng: &mut StdRng) -> Result<OptimizationResult> {
        validate(samples)?;

        let n = samples.len();
        let c = self.config.c;
        let tol = self.config.epsilon;
        let mut matrix = KernelMatrix::new(self.kernel, samples, self.config.cache_size);

        let mut alpha = vec![0.0; n];
        let mut b = 0.0;
        // E_i = f(x_i) - y_i, and f is 0 while every alpha is 0
        let mut errors: Vec<f64> = samples.iter().map(|s| -s.label).collect();

        let mut passes = 0;
        let mut iterations = 0;
        while passes < self.config.max_passes && iterations < self.config.max_iterations {
            let mut changed = 0;

            for i in 0..n {
                let y_i = samples[i].label;
                let r_i = errors[i] * y_i;
                if !((r_i < -tol && alpha[i] < c) || (r_i > tol && alpha[i] > 0.0)) {
                    continue;
                }

                let j = {
                    let j = rng.gen_range(0..n - 1);
                    if j >= i {
                        j + 1
                    } else {
                        j
                    }
                };
                if self.take_step(i, j, samples, &mut matrix, &mut alpha, &mut b, &mut errors) {
                    changed += 1;
                }
            }

            iterations += 1;
            passes = if changed == 0 { passes + 1 } else { 0 };
        }

        let support_vectors: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a > 0.0)
            .map(|(i, _)| i)
            .collect();

        debug!(
            "SMO finished after {} sweeps: {} support vectors, kernel cache hit rate {:.2}",
            iterations,
            support_vectors.len(),
            matrix.hit_rate()
        );

        Ok(OptimizationResult {
            alpha,
            b,
            support_vectors,
            iterations,
        })
    }

    /// Jointly optimize alpha_i and alpha_j; returns whether anything changed
    #[allow(clippy::too_many_arguments)]
    fn take_step(
        &self,
        i: usize,
        j: usize,
        samples: &[Sample],
        matrix: &mut KernelMatrix<'_, K>,
        alpha: &mut [f64],
        b: &mut f64,
        errors: &mut [f64],
    ) -> bool {
        let c = self.config.c;
        let y_i = samples[i].label;
        let y_j = samples[j].label;
        let alpha_i_old = alpha[i];
        let alpha_j_old = alpha[j];
        let e_i = errors[i];
        let e_j = errors[j];

        let (low, high) = if y_i != y_j {
            (
                (alpha_j_old - alpha_i_old).max(0.0),
                (c + alpha_j_old - alpha_i_old).min(c),
            )
        } else {
            (
                (alpha_i_old + alpha_j_old - c).max(0.0),
                (alpha_i_old + alpha_j_old).min(c),
            )
        };
        if low >= high {
            return false;
        }

        let k_ii = matrix.get(i, i);
        let k_ij = matrix.get(i, j);
        let k_jj = matrix.get(j, j);
        let eta = 2.0 * k_ij - k_ii - k_jj;
        if eta >= 0.0 {
            return false;
        }

        let alpha_j_new = (alpha_j_old - y_j * (e_i - e_j) / eta).clamp(low, high);
        if (alpha_j_new - alpha_j_old).abs() < MIN_ALPHA_STEP {
            return false;
        }
        let alpha_i_new = alpha_i_old + y_i * y_j * (alpha_j_old - alpha_j_new);

        let delta_i = y_i * (alpha_i_new - alpha_i_old);
        let delta_j = y_j * (alpha_j_new - alpha_j_old);
        let b1 = *b - e_i - delta_i * k_ii - delta_j * k_ij;
        let b2 = *b - e_j - delta_i * k_ij - delta_j * k_jj;
        let b_new = if alpha_i_new > 0.0 && alpha_i_new < c {
            b1
        } else if alpha_j_new > 0.0 && alpha_j_new < c {
            b2
        } else {
            (b1 + b2) / 2.0
        };
        let delta_b = b_new - *b;

        alpha[i] = alpha_i_new;
        alpha[j] = alpha_j_new;
        *b = b_new;

        for (k, error) in errors.iter_mut().enumerate() {
            *error += delta_i * matrix.get(i, k) + delta_j * matrix.get(j, k) + delta_b;
        }

        true
    }
}

/// Labels must be +1/-1 and both classes must be present
fn validate(samples: &[Sample]) -> Result<()> {
    if samples.is_empty() {
        return Err(ReproError::EmptyDataset);
    }
    if let Some(sample) = samples
        .iter()
        .find(|s| s.label != 1.0 && s.label != -1.0)
    {
        return Err(ReproError::InvalidLabel(sample.label));
    }
    let positives = samples.iter().filter(|s| s.label > 0.0).count();
    if positives == 0 || positives == samples.len() {
        return Err(ReproError::InvalidDataset(
            "Training data must contain both +1 and -1 labels".to_string(),
        ));
    }
    Ok(())
}
