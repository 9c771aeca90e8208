//! Precision tightening of tree-derived bounds.
//!
//! Split thresholds learned by a tree usually sit between two observed
//! values and carry more digits than the training data. This pass snaps
//! every tree-derived bound to the first value *inside* the admissible side
//! at the data's decimal precision, so that a generator drawing values at
//! that precision lands on the correct side of each split.
//!
//! # Rounding
//!
//! At precision `p` (scale `s = 10^p`):
//!
//! | bound | rule |
//! |-------|------|
//! | lower (`x > t`) | `(t >= 0 ? ceil(t*s) : floor(t*s)) + 1`, then `/ s` |
//! | upper (`x <= t`) | `(t > 0 ? ceil(t*s) : floor(t*s)) - 1`, then `/ s` |
//!
//! With one decimal place, `5.0` becomes `5.1` as a lower bound and `4.9` as
//! an upper bound. The rules are not exact mirrors for non-grid thresholds
//! (a lower bound of `4.95` also becomes `5.1`); this asymmetry is kept on
//! purpose so that outputs match existing reports.

use tracing::{debug, trace};

use super::config::validate_stats;
use super::error::DeriveError;
use super::interval::{Bound, FeatureInterval};
use super::path::{DecisionPath, PathPhase};
use crate::data::FeatureStats;
use crate::repr::ClassLabel;
use crate::utils::Parallelism;

/// Highest precision a bound is tightened to.
pub const MAX_TIGHTENING_PRECISION: u32 = 6;

/// Highest number of decimal places an interval may require.
///
/// f64 holds 15 significant decimal digits.
pub const MAX_DECIMAL_PLACES: u32 = 15;

// =============================================================================
// Rounding helpers
// =============================================================================

/// `10^-decimal_places`, the smallest step at a precision.
#[inline]
pub fn unit(decimal_places: u32) -> f64 {
    1.0 / scale(decimal_places)
}

#[inline]
fn scale(decimal_places: u32) -> f64 {
    10f64.powi(decimal_places as i32)
}

/// Remove floating point noise from a scaled value.
///
/// `4.9 * 10.0` is `49.00000000000001`; rounding that up would skip a whole
/// step.
#[inline]
fn snap(scaled: f64) -> f64 {
    let nearest = scaled.round();
    if (scaled - nearest).abs() <= 1e-9 * nearest.abs().max(1.0) {
        nearest
    } else {
        scaled
    }
}

/// First value strictly above `threshold` at `decimal_places`.
pub fn tighten_lower(threshold: f64, decimal_places: u32) -> f64 {
    let s = scale(decimal_places);
    let scaled = snap(threshold * s);
    let rounded = if threshold >= 0.0 {
        scaled.ceil()
    } else {
        scaled.floor()
    };
    (rounded + 1.0) / s
}

/// Value one step below `threshold` at `decimal_places`.
pub fn tighten_upper(threshold: f64, decimal_places: u32) -> f64 {
    let s = scale(decimal_places);
    let scaled = snap(threshold * s);
    let rounded = if threshold > 0.0 {
        scaled.ceil()
    } else {
        scaled.floor()
    };
    (rounded - 1.0) / s
}

/// Round `value` down onto the grid of `decimal_places`.
pub fn quantize_down(value: f64, decimal_places: u32) -> f64 {
    let s = scale(decimal_places);
    snap(value * s).floor() / s
}

/// Round `value` up onto the grid of `decimal_places`.
pub fn quantize_up(value: f64, decimal_places: u32) -> f64 {
    let s = scale(decimal_places);
    snap(value * s).ceil() / s
}

// =============================================================================
// TighteningReport
// =============================================================================

/// Summary of one tightening pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TighteningReport {
    /// Paths tightened by this call.
    pub paths: usize,
    /// Paths skipped because they were already tightened.
    pub skipped: usize,
    /// Tree-derived bounds successfully quantized.
    pub quantized: usize,
    /// Tree-derived bounds left unquantized because tightening would have
    /// crossed the opposite bound.
    pub rolled_back: usize,
    /// Contradictory intervals collapsed onto their lower bound.
    pub collapsed: usize,
}

impl TighteningReport {
    fn merge(mut self, other: Self) -> Self {
        self.paths += other.paths;
        self.skipped += other.skipped;
        self.quantized += other.quantized;
        self.rolled_back += other.rolled_back;
        self.collapsed += other.collapsed;
        self
    }
}

// =============================================================================
// PrecisionTightener
// =============================================================================

/// Quantizes tree-derived bounds to the training data's precision.
///
/// Accepts paths in the `Raw` phase and moves them to `Tightened`. Paths
/// that are already `Tightened` are left untouched, so running the pass
/// twice is the same as running it once.
#[derive(Debug, Clone)]
pub struct PrecisionTightener<'a> {
    stats: &'a [FeatureStats],
    parallelism: Parallelism,
}

impl<'a> PrecisionTightener<'a> {
    /// Create a tightener over per-feature statistics.
    pub fn new(stats: &'a [FeatureStats]) -> Self {
        Self {
            stats,
            parallelism: Parallelism::Sequential,
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Tighten every path in place.
    ///
    /// # Errors
    ///
    /// - [`DeriveError::PhaseOrder`] if a path already has a boundary zone.
    /// - [`DeriveError::Config`] if the statistics do not cover every
    ///   feature or hold an invalid range.
    ///
    /// Checks run before any path is modified.
    pub fn tighten<C: ClassLabel>(
        &self,
        paths: &mut [DecisionPath<C>],
    ) -> Result<TighteningReport, DeriveError> {
        for (index, path) in paths.iter().enumerate() {
            path.check_phase(index, &[PathPhase::Raw, PathPhase::Tightened], "raw or tightened")?;
            validate_stats(self.stats, path.n_features())?;
        }

        let report = self
            .parallelism
            .maybe_par_map_mut(paths, |index, path| self.tighten_path(index, path))
            .into_iter()
            .fold(TighteningReport::default(), TighteningReport::merge);

        debug!(
            paths = report.paths,
            skipped = report.skipped,
            quantized = report.quantized,
            rolled_back = report.rolled_back,
            collapsed = report.collapsed,
            "Tightened decision paths"
        );
        Ok(report)
    }

    fn tighten_path<C>(&self, index: usize, path: &mut DecisionPath<C>) -> TighteningReport {
        if path.phase() == PathPhase::Tightened {
            return TighteningReport {
                skipped: 1,
                ..Default::default()
            };
        }

        let mut report = TighteningReport {
            paths: 1,
            ..Default::default()
        };
        for (interval, stats) in path.intervals_mut().iter_mut().zip(self.stats) {
            tighten_interval(index, interval, stats, &mut report);
        }
        path.advance(PathPhase::Tightened);
        report
    }
}

/// Run the full precision pass on one interval.
fn tighten_interval(
    path: usize,
    interval: &mut FeatureInterval,
    stats: &FeatureStats,
    report: &mut TighteningReport,
) {
    let feature = interval.feature();
    let precision = stats.decimal_places.min(MAX_TIGHTENING_PRECISION);

    // Backfill non-tree sides with the observed range, never emptying it.
    if !interval.lower_from_tree() {
        let lower = match interval.upper() {
            Bound::Finite(u) => stats.min.min(u),
            Bound::Unbounded => stats.min,
        };
        interval.backfill_lower(lower);
    }
    if !interval.upper_from_tree() {
        let upper = match interval.lower() {
            Bound::Finite(l) if interval.lower_exclusive() && stats.max <= l => {
                step_above(l, precision)
            }
            Bound::Finite(l) => stats.max.max(l),
            Bound::Unbounded => stats.max,
        };
        interval.backfill_upper(upper);
    }

    let (Bound::Finite(mut lower), Bound::Finite(mut upper)) = (interval.lower(), interval.upper())
    else {
        return;
    };

    if lower > upper {
        trace!(path, feature, lower, upper, "Collapsing contradictory interval");
        interval.collapse_to_lower();
        upper = lower;
        report.collapsed += 1;
    }

    // A candidate must move strictly inside its own side and keep at least
    // one admissible value against the opposite bound.
    if interval.lower_from_tree() && interval.lower_exclusive() {
        let candidate = tighten_lower(lower, precision);
        if candidate.is_finite()
            && candidate > lower
            && admits_below(candidate, upper, interval.upper_exclusive())
        {
            interval.quantize_lower(candidate);
            lower = candidate;
            report.quantized += 1;
        } else {
            trace!(path, feature, lower, candidate, upper, "Rolled back lower tightening");
            report.rolled_back += 1;
        }
    }

    if interval.upper_from_tree() {
        let candidate = tighten_upper(upper, precision);
        if candidate.is_finite()
            && candidate < upper
            && admits_above(candidate, lower, interval.lower_exclusive())
        {
            interval.quantize_upper(candidate);
            upper = candidate;
            report.quantized += 1;
        } else {
            trace!(path, feature, lower, candidate, upper, "Rolled back upper tightening");
            report.rolled_back += 1;
        }
    }

    let mut decimal_places = (precision + 1).min(MAX_TIGHTENING_PRECISION);
    let width = upper - lower;
    while width > 0.0 && width < unit(decimal_places) && decimal_places < MAX_DECIMAL_PLACES {
        decimal_places += 1;
    }

    interval.set_decimal_places(decimal_places);
    interval.set_kind(stats.kind);
}

/// Whether `value` satisfies a lower bound.
#[inline]
pub(crate) fn admits_above(value: f64, lower: f64, exclusive: bool) -> bool {
    if exclusive { value > lower } else { value >= lower }
}

/// Whether `value` satisfies an upper bound.
#[inline]
pub(crate) fn admits_below(value: f64, upper: f64, exclusive: bool) -> bool {
    if exclusive { value < upper } else { value <= upper }
}

/// Smallest value strictly above `threshold`, on the grid when possible.
///
/// Past 2^53 / 10^p the grid step is lost to f64 rounding; fall back to the
/// next representable value.
fn step_above(threshold: f64, decimal_places: u32) -> f64 {
    let candidate = tighten_lower(threshold, decimal_places);
    if candidate > threshold {
        candidate
    } else {
        threshold.next_up()
    }
}

// =============================================================================
// Tests
// =============================================================================
