//! Common utilities used across the crate.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Passed through the tightening and boundary passes. When parallel, those
/// passes process paths with `rayon` parallel iterators; when sequential,
/// they iterate in path order. Both produce identical output because every
/// path owns its intervals and its random stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Apply `f` to every item together with its index and collect the
    /// results in item order.
    #[inline]
    pub fn maybe_par_map_mut<T, R, F>(self, items: &mut [T], f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, &mut T) -> R + Sync + Send,
    {
        if self.is_parallel() {
            items
                .par_iter_mut()
                .enumerate()
                .map(|(i, item)| f(i, item))
                .collect()
        } else {
            items
                .iter_mut()
                .enumerate()
                .map(|(i, item)| f(i, item))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_constants() {
        assert!(Parallelism::Parallel.is_parallel());
        assert!(!Parallelism::Sequential.is_parallel());
        assert_eq!(Parallelism::default(), Parallelism::Sequential);
    }

    #[test]
    fn test_map_mut_preserves_order() {
        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let mut items: Vec<u64> = (0..100).collect();
            let out = parallelism.maybe_par_map_mut(&mut items, |i, x| {
                *x *= 2;
                i as u64 + *x
            });
            assert_eq!(items, (0..100).map(|x| x * 2).collect::<Vec<_>>());
            assert_eq!(out, (0..100).map(|i| i * 3).collect::<Vec<_>>());
        }
    }
}
