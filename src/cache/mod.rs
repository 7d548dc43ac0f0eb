//! Cached kernel evaluations over a fixed sample set
//!
//! The SMO solver asks for the same K(i, j) many times while it sweeps the training set.
//! Kernel matrices are symmetric, so entries are stored once under a key with i <= j.

use crate::core::Sample;
use crate::kernel::Kernel;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Normalized (i <= j) position in the kernel matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

/// Kernel matrix of a sample set, computed lazily and kept in an LRU cache
pub struct KernelMatrix<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    samples: &'a [Sample],
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl<'a, K: Kernel + ?Sized> KernelMatrix<'a, K> {
    /// Create a kernel matrix caching at most `capacity` entries
    pub fn new(kernel: &'a K, samples: &'a [Sample], capacity: usize) -> Self {
        // Never reserve more than the number of distinct entries
        let n = samples.len();
        let distinct = n.saturating_mul(n.saturating_add(1)) / 2;
        let capacity = NonZeroUsize::new(capacity.min(distinct)).unwrap_or(NonZeroUsize::MIN);
        Self {
            kernel,
            samples,
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.samples.len()
    }

    /// K(x_i, x_j)
    pub fn get(&mut self, i: usize, j: usize) -> f64 {
        let key = CacheKey::new(i, j);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = self
            .kernel
            .compute(&self.samples[key.i].features, &self.samples[key.j].features);
        self.cache.put(key, value);
        value
    }

    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::kernel::LinearKernel;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(SparseVector::new(vec![0], vec![1.0]), 1.0),
            Sample::new(SparseVector::new(vec![0, 1], vec![2.0, 1.0]), -1.0),
            Sample::new(SparseVector::new(vec![1], vec![3.0]), 1.0),
        ]
    }

    #[test]
    fn test_cache_key_normalization() {
        assert_eq!(CacheKey::new(1, 5), CacheKey::new(5, 1));
    }

    #[test]
    fn test_symmetric_lookups_share_an_entry() {
        let samples = samples();
        let kernel = LinearKernel::new();
        let mut matrix = KernelMatrix::new(&kernel, &samples, 10);

        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(1, 0), 2.0);
        let stats = matrix.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(matrix.hit_rate(), 0.5);
    }

    #[test]
    fn test_eviction_recomputes() {
        let samples = samples();
        let kernel = LinearKernel::new();
        let mut matrix = KernelMatrix::new(&kernel, &samples, 1);

        assert_eq!(matrix.get(0, 0), 1.0);
        assert_eq!(matrix.get(2, 2), 9.0);
        // (0, 0) was evicted and is computed again
        assert_eq!(matrix.get(0, 0), 1.0);
        assert_eq!(matrix.stats().misses, 3);
        assert_eq!(matrix.stats().capacity, 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let samples = samples();
        let kernel = LinearKernel::new();
        let matrix = KernelMatrix::new(&kernel, &samples, 0);
        assert_eq!(matrix.stats().capacity, 1);
        assert_eq!(matrix.size(), 3);
    }

    #[test]
    fn test_capacity_is_bounded_by_distinct_entries() {
        let samples = samples();
        let kernel = LinearKernel::new();
        let matrix = KernelMatrix::new(&kernel, &samples, 1_000_000);
        assert_eq!(matrix.stats().capacity, 6);
    }
}
