//! Boundary-value zones next to tree-derived thresholds.
//!
//! For each constrained feature of a tightened path, a narrow zone of
//! `boundary_value_percentage` percent of the interval width is placed
//! against one tree-derived bound. Values drawn from the zone exercise the
//! model right next to a decision threshold.
//!
//! When both bounds come from the tree, the side is chosen by a generator
//! private to the path. Its seed mixes the global seed with the path index,
//! so output does not depend on processing order or thread count.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, trace};

use super::config::{ConfigError, validate_percentage};
use super::error::DeriveError;
use super::interval::{Anchor, Bound, BoundaryZone, FeatureInterval};
use super::path::{DecisionPath, PathPhase};
use super::precision::{quantize_down, quantize_up, tighten_lower, tighten_upper};
use crate::repr::ClassLabel;
use crate::utils::Parallelism;

/// Golden-ratio increment of SplitMix64.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Generator for the path at `index`.
///
/// `seed_from_u64` expands the mixed seed through SplitMix64, so adjacent
/// indices yield unrelated streams.
pub(crate) fn path_rng(seed: u64, index: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add((index as u64).wrapping_mul(SEED_STRIDE)))
}

// =============================================================================
// BoundaryReport
// =============================================================================

/// Summary of one boundary pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryReport {
    /// Zones anchored at a lower bound.
    pub lower_anchored: usize,
    /// Zones anchored at an upper bound.
    pub upper_anchored: usize,
    /// Zones discarded because they collapsed after quantization.
    pub discarded: usize,
}

impl BoundaryReport {
    pub fn zones(&self) -> usize {
        self.lower_anchored + self.upper_anchored
    }

    fn merge(mut self, other: Self) -> Self {
        self.lower_anchored += other.lower_anchored;
        self.upper_anchored += other.upper_anchored;
        self.discarded += other.discarded;
        self
    }
}

// =============================================================================
// BoundaryDeriver
// =============================================================================

/// Derives seeded boundary zones on tightened paths.
#[derive(Debug, Clone)]
pub struct BoundaryDeriver {
    percentage: f64,
    seed: u64,
    parallelism: Parallelism,
}

impl BoundaryDeriver {
    /// Create a deriver.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBoundaryPercentage`] unless `percentage` is a
    /// finite value in [0, 100].
    pub fn new(percentage: f64, seed: u64) -> Result<Self, ConfigError> {
        validate_percentage(percentage)?;
        Ok(Self {
            percentage,
            seed,
            parallelism: Parallelism::Sequential,
        })
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[inline]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive a zone for every constrained feature of every path.
    ///
    /// # Errors
    ///
    /// [`DeriveError::PhaseOrder`] unless every path is `Tightened`. No path
    /// is modified in that case.
    pub fn derive<C: ClassLabel>(
        &self,
        paths: &mut [DecisionPath<C>],
    ) -> Result<BoundaryReport, DeriveError> {
        for (index, path) in paths.iter().enumerate() {
            path.check_phase(index, &[PathPhase::Tightened], "tightened")?;
        }

        let report = self
            .parallelism
            .maybe_par_map_mut(paths, |index, path| self.derive_path(index, path))
            .into_iter()
            .fold(BoundaryReport::default(), BoundaryReport::merge);

        debug!(
            percentage = self.percentage,
            seed = self.seed,
            zones = report.zones(),
            discarded = report.discarded,
            "Derived boundary zones"
        );
        Ok(report)
    }

    fn derive_path<C>(&self, index: usize, path: &mut DecisionPath<C>) -> BoundaryReport {
        let mut rng = path_rng(self.seed, index);
        let mut report = BoundaryReport::default();

        for interval in path.intervals_mut() {
            let anchor = match (interval.lower_from_tree(), interval.upper_from_tree()) {
                (true, true) => {
                    if rng.gen_bool(0.5) {
                        Anchor::Lower
                    } else {
                        Anchor::Upper
                    }
                }
                (true, false) => Anchor::Lower,
                (false, true) => Anchor::Upper,
                (false, false) => {
                    interval.set_boundary(None);
                    continue;
                }
            };

            let zone = self.zone(interval, anchor);
            match zone {
                Some(z) if z.lower_anchored => report.lower_anchored += 1,
                Some(_) => report.upper_anchored += 1,
                None => {
                    trace!(
                        path = index,
                        feature = interval.feature(),
                        ?anchor,
                        "Discarded collapsed boundary zone"
                    );
                    report.discarded += 1;
                }
            }
            interval.set_boundary(zone);
        }

        path.advance(PathPhase::BoundaryDerived);
        report
    }

    /// Zone of `percentage` of the width against the `anchor` side.
    ///
    /// Both endpoints must satisfy the interval's predicate; a zone that
    /// cannot is discarded.
    fn zone(&self, interval: &FeatureInterval, anchor: Anchor) -> Option<BoundaryZone> {
        let (Bound::Finite(lower), Bound::Finite(upper)) = (interval.lower(), interval.upper())
        else {
            return None;
        };
        let decimal_places = interval.decimal_places();
        let margin = (upper - lower) * self.percentage / 100.0;

        // First admissible grid values on each side. Quantized bounds are
        // inclusive and already on the grid.
        let floor = if interval.lower_exclusive() {
            tighten_lower(lower, decimal_places)
        } else {
            lower
        };
        let ceiling = if interval.upper_exclusive() {
            tighten_upper(upper, decimal_places)
        } else {
            upper
        };

        let (start, end) = match anchor {
            Anchor::Lower => (floor, quantize_down(lower + margin, decimal_places).min(ceiling)),
            Anchor::Upper => {
                let end = if interval.upper_quantized() {
                    upper
                } else {
                    tighten_upper(upper, decimal_places)
                };
                (quantize_up(upper - margin, decimal_places).max(floor), end)
            }
        };

        let admissible = start.is_finite()
            && end.is_finite()
            && start < end
            && interval.contains(start)
            && interval.contains(end);
        admissible.then(|| BoundaryZone::anchored(anchor, start, end))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureStats;
    use crate::partition::{PrecisionTightener, TreeWalker};
    use approx::assert_abs_diff_eq;
    use rand::RngCore;

    fn tightened(intervals: Vec<FeatureInterval>, stats: &[FeatureStats]) -> Vec<DecisionPath<u8>> {
        let mut paths = vec![DecisionPath::new(1, 0, intervals)];
        PrecisionTightener::new(stats).tighten(&mut paths).unwrap();
        paths
    }

    #[test]
    fn path_streams_differ() {
        let a = path_rng(42, 0).next_u64();
        let b = path_rng(42, 1).next_u64();
        assert_ne!(a, b);
        assert_eq!(a, path_rng(42, 0).next_u64());
    }

    #[test]
    fn upper_anchored_zone() {
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_upper(5.0);
        let mut paths = tightened(vec![interval], &[FeatureStats::new(1, 0.0, 10.0)]);

        let report = BoundaryDeriver::new(10.0, 7).unwrap().derive(&mut paths).unwrap();
        assert_eq!(report.upper_anchored, 1);

        let zone = paths[0].interval(0).boundary().copied().unwrap();
        assert_eq!(zone.anchor(), Anchor::Upper);
        assert_abs_diff_eq!(zone.lower, 4.41, epsilon = 1e-12);
        assert_abs_diff_eq!(zone.upper, 4.9, epsilon = 1e-12);
        assert_eq!(paths[0].phase(), PathPhase::BoundaryDerived);
    }

    #[test]
    fn lower_anchored_zone() {
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_lower(5.0);
        let mut paths = tightened(vec![interval], &[FeatureStats::new(1, 0.0, 10.0)]);

        BoundaryDeriver::new(10.0, 7).unwrap().derive(&mut paths).unwrap();

        let zone = paths[0].interval(0).boundary().copied().unwrap();
        assert!(zone.lower_anchored);
        assert!(!zone.upper_anchored);
        assert_abs_diff_eq!(zone.lower, 5.1, epsilon = 1e-12);
        assert_abs_diff_eq!(zone.upper, 5.59, epsilon = 1e-12);
    }

    #[test]
    fn unconstrained_features_get_no_zone() {
        let mut paths = tightened(
            vec![FeatureInterval::unbounded(0)],
            &[FeatureStats::new(1, 0.0, 10.0)],
        );
        let report = BoundaryDeriver::new(10.0, 7).unwrap().derive(&mut paths).unwrap();

        assert_eq!(report, BoundaryReport::default());
        let interval = paths[0].interval(0);
        assert!(interval.boundary().is_none());
        assert_eq!(interval.boundary_range(), Some((0.0, 10.0)));
    }

    #[test]
    fn zero_percentage_discards_zone() {
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_upper(5.0);
        let mut paths = tightened(vec![interval], &[FeatureStats::new(1, 0.0, 10.0)]);

        let report = BoundaryDeriver::new(0.0, 7).unwrap().derive(&mut paths).unwrap();
        assert_eq!(report.discarded, 1);
        let interval = paths[0].interval(0);
        assert!(interval.boundary().is_none());
        assert_eq!(interval.boundary_range(), Some((0.0, 4.9)));
    }

    #[test]
    fn two_sided_intervals_pick_a_side_per_seed() {
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_lower(0.0);
        interval.constrain_upper(10.0);
        let template = tightened(vec![interval], &[FeatureStats::new(0, -100.0, 100.0)]);

        let mut anchors = Vec::new();
        for seed in 0..32 {
            let mut paths = template.clone();
            BoundaryDeriver::new(20.0, seed).unwrap().derive(&mut paths).unwrap();
            let zone = paths[0].interval(0).boundary().copied().unwrap();
            assert!(zone.lower >= 1.0 && zone.upper <= 9.0);
            anchors.push(zone.anchor());

            let mut again = template.clone();
            BoundaryDeriver::new(20.0, seed).unwrap().derive(&mut again).unwrap();
            assert_eq!(paths, again);
        }
        assert!(anchors.contains(&Anchor::Lower));
        assert!(anchors.contains(&Anchor::Upper));
    }

    #[test]
    fn retightens_rolled_back_anchor() {
        // 4.95 < x <= 5.05 at one decimal: the lower side was rolled back
        // and gets re-tightened at two decimals.
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_lower(4.95);
        interval.constrain_upper(5.05);
        let mut paths = tightened(vec![interval], &[FeatureStats::new(1, 0.0, 10.0)]);
        assert!(!paths[0].interval(0).lower_quantized());

        let zone = BoundaryDeriver::new(100.0, 3)
            .unwrap()
            .zone(paths[0].interval(0), Anchor::Lower)
            .unwrap();
        assert_abs_diff_eq!(zone.lower, 4.96, epsilon = 1e-12);
        assert_abs_diff_eq!(zone.upper, 5.0, epsilon = 1e-12);

        BoundaryDeriver::new(10.0, 3).unwrap().derive(&mut paths).unwrap();
        if let Some(zone) = paths[0].interval(0).boundary() {
            assert!(zone.lower >= 4.95 && zone.upper <= 5.0);
        }
    }

    #[test]
    fn zones_never_touch_an_excluded_bound() {
        // 4.95 < x <= 5.05 at one decimal keeps an exclusive lower of 4.95.
        let mut interval = FeatureInterval::unbounded(0);
        interval.constrain_lower(4.95);
        interval.constrain_upper(5.05);
        let template = tightened(vec![interval], &[FeatureStats::new(1, 0.0, 10.0)]);
        assert!(template[0].interval(0).lower_exclusive());

        let zone = BoundaryDeriver::new(100.0, 1)
            .unwrap()
            .zone(template[0].interval(0), Anchor::Upper)
            .unwrap();
        assert_abs_diff_eq!(zone.lower, 4.96, epsilon = 1e-12);
        assert_abs_diff_eq!(zone.upper, 5.0, epsilon = 1e-12);

        for seed in 0..32 {
            let mut paths = template.clone();
            let report = BoundaryDeriver::new(100.0, seed).unwrap().derive(&mut paths).unwrap();
            assert_eq!(report.zones(), 1);

            let interval = paths[0].interval(0);
            let zone = interval.boundary().unwrap();
            assert!(!interval.contains(4.95));
            assert!(interval.contains(zone.lower) && interval.contains(zone.upper));
            crate::testing::assert_path_invariants(&paths[0]);
        }
    }

    #[test]
    fn nested_splits_get_admissible_zones() {
        let tree = crate::class_tree! {
            0 => split(0, 4.9) -> 1, 2,
            1 => leaf(0u8),
            2 => split(0, 4.95) -> 3, 4,
            3 => leaf(1u8),
            4 => leaf(2u8),
        };
        let stats = [FeatureStats::new(1, 0.0, 10.0)];

        for seed in 0..16 {
            let mut paths = TreeWalker::new(1).walk(&tree).unwrap();
            PrecisionTightener::new(&stats).tighten(&mut paths).unwrap();
            BoundaryDeriver::new(100.0, seed).unwrap().derive(&mut paths).unwrap();

            for path in &paths {
                crate::testing::assert_path_invariants(path);
            }
            // (4.9, 4.95] at two decimals holds 4.91..=4.95.
            let middle = paths[1].interval(0);
            let (lower, upper) = middle.boundary_range().unwrap();
            assert!(middle.boundary().is_some());
            assert!(lower >= 4.91 - 1e-12 && upper <= 4.95 + 1e-12);
        }
    }

    #[test]
    fn requires_tightened_paths() {
        let mut paths = vec![DecisionPath::new(1u8, 0, vec![FeatureInterval::unbounded(0)])];
        let err = BoundaryDeriver::new(10.0, 1).unwrap().derive(&mut paths).unwrap_err();
        assert_eq!(
            err,
            DeriveError::PhaseOrder {
                path: 0,
                expected: "tightened",
                found: PathPhase::Raw,
            }
        );

        let mut paths = tightened(
            vec![FeatureInterval::unbounded(0)],
            &[FeatureStats::new(1, 0.0, 1.0)],
        );
        let deriver = BoundaryDeriver::new(10.0, 1).unwrap();
        deriver.derive(&mut paths).unwrap();
        assert!(deriver.derive(&mut paths).is_err());
    }

    #[test]
    fn rejects_bad_percentage() {
        assert_eq!(
            BoundaryDeriver::new(-1.0, 0).unwrap_err(),
            ConfigError::InvalidBoundaryPercentage(-1.0)
        );
    }
}
