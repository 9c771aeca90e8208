//! Per-feature admissible value ranges of a decision path.
//!
//! A [`FeatureInterval`] starts unbounded on both sides, is narrowed by the
//! splits on its path, and is then adjusted in place by the precision and
//! boundary passes. Mutation is crate-private: downstream consumers only read.

use serde::{Deserialize, Serialize};

use crate::data::ValueKind;

// =============================================================================
// Bound
// =============================================================================

/// One endpoint of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    /// No constraint on this side.
    Unbounded,
    /// A finite endpoint.
    Finite(f64),
}

impl Bound {
    /// The endpoint value, `None` when unbounded.
    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            Bound::Unbounded => None,
            Bound::Finite(v) => Some(v),
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        matches!(self, Bound::Finite(_))
    }
}

// =============================================================================
// BoundaryZone
// =============================================================================

/// Which tree-derived bound a boundary zone sits next to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    Lower,
    Upper,
}

/// Narrow sub-interval adjacent to a tree-derived bound.
///
/// Exactly one endpoint is anchored: it coincides with (or was re-tightened
/// from) the interval's tree-derived bound. The other endpoint was computed
/// from the boundary margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryZone {
    pub lower: f64,
    pub upper: f64,
    pub lower_anchored: bool,
    pub upper_anchored: bool,
}

impl BoundaryZone {
    pub(crate) fn anchored(anchor: Anchor, lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            lower_anchored: anchor == Anchor::Lower,
            upper_anchored: anchor == Anchor::Upper,
        }
    }

    /// The side this zone is anchored to.
    pub fn anchor(&self) -> Anchor {
        if self.lower_anchored {
            Anchor::Lower
        } else {
            Anchor::Upper
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

// =============================================================================
// SamplingStrategy
// =============================================================================

/// How the test generator should draw values for one feature on one path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// The path never splits on the feature: draw from the values observed
    /// in the training data.
    Observed,
    /// Draw from the (tightened) path interval.
    Range {
        lower: Bound,
        upper: Bound,
        exclude_lower: bool,
        exclude_upper: bool,
        decimal_places: u32,
        kind: ValueKind,
    },
    /// Draw from the boundary zone next to a split threshold.
    Boundary {
        lower: f64,
        upper: f64,
        decimal_places: u32,
        kind: ValueKind,
    },
}

// =============================================================================
// FeatureInterval
// =============================================================================

/// Admissible range of one feature on one decision path.
///
/// Provenance flags tell which bounds came from tree splits
/// (`*_from_tree`) and which tree-derived bounds were successfully quantized
/// by the precision pass (`*_quantized`). A tree-derived bound that stays
/// unquantized was rolled back because quantizing it would have emptied the
/// interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInterval {
    feature: usize,
    lower: Bound,
    upper: Bound,
    lower_exclusive: bool,
    upper_exclusive: bool,
    lower_from_tree: bool,
    upper_from_tree: bool,
    lower_quantized: bool,
    upper_quantized: bool,
    kind: ValueKind,
    decimal_places: u32,
    boundary: Option<BoundaryZone>,
}

impl FeatureInterval {
    /// A fresh interval with both sides unbounded.
    pub fn unbounded(feature: usize) -> Self {
        Self {
            feature,
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            lower_exclusive: false,
            upper_exclusive: false,
            lower_from_tree: false,
            upper_from_tree: false,
            lower_quantized: false,
            upper_quantized: false,
            kind: ValueKind::default(),
            decimal_places: 0,
            boundary: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn feature(&self) -> usize {
        self.feature
    }

    #[inline]
    pub fn lower(&self) -> Bound {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> Bound {
        self.upper
    }

    /// Whether the lower bound itself is excluded. Quantized bounds are
    /// always inclusive.
    #[inline]
    pub fn lower_exclusive(&self) -> bool {
        self.lower_exclusive
    }

    #[inline]
    pub fn upper_exclusive(&self) -> bool {
        self.upper_exclusive
    }

    #[inline]
    pub fn lower_from_tree(&self) -> bool {
        self.lower_from_tree
    }

    #[inline]
    pub fn upper_from_tree(&self) -> bool {
        self.upper_from_tree
    }

    #[inline]
    pub fn lower_quantized(&self) -> bool {
        self.lower_quantized
    }

    #[inline]
    pub fn upper_quantized(&self) -> bool {
        self.upper_quantized
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Fractional digits needed to sample inside this interval.
    #[inline]
    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    /// The boundary zone, `None` if absent or discarded.
    #[inline]
    pub fn boundary(&self) -> Option<&BoundaryZone> {
        self.boundary.as_ref()
    }

    /// Whether any split on the path constrained this feature.
    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.lower_from_tree || self.upper_from_tree
    }

    /// `upper - lower`, `None` if either side is unbounded.
    pub fn width(&self) -> Option<f64> {
        Some(self.upper.value()? - self.lower.value()?)
    }

    /// Whether `x` satisfies this interval's predicate.
    ///
    /// Respects exclusivity; unbounded sides accept everything.
    pub fn contains(&self, x: f64) -> bool {
        let above = match self.lower {
            Bound::Unbounded => true,
            Bound::Finite(l) if self.lower_exclusive => x > l,
            Bound::Finite(l) => x >= l,
        };
        let below = match self.upper {
            Bound::Unbounded => true,
            Bound::Finite(u) if self.upper_exclusive => x < u,
            Bound::Finite(u) => x <= u,
        };
        above && below
    }

    /// Whether at least one value satisfies the predicate.
    pub fn is_satisfiable(&self) -> bool {
        match (self.lower, self.upper) {
            (Bound::Finite(l), Bound::Finite(u)) => {
                if self.lower_exclusive || self.upper_exclusive {
                    l < u
                } else {
                    l <= u
                }
            }
            _ => true,
        }
    }

    /// The range boundary testing should draw from.
    ///
    /// The boundary zone when present; otherwise the full interval, which is
    /// what a discarded or never-derived zone falls back to.
    pub fn boundary_range(&self) -> Option<(f64, f64)> {
        match &self.boundary {
            Some(zone) => Some((zone.lower, zone.upper)),
            None => Some((self.lower.value()?, self.upper.value()?)),
        }
    }

    /// Pick the generation strategy for this feature.
    ///
    /// A quantized bound already lies strictly inside the admissible side
    /// and is inclusive, so only unquantized exclusive bounds are excluded.
    pub fn strategy(&self) -> SamplingStrategy {
        if !self.is_constrained() {
            return SamplingStrategy::Observed;
        }

        match &self.boundary {
            Some(zone) => SamplingStrategy::Boundary {
                lower: zone.lower,
                upper: zone.upper,
                decimal_places: self.decimal_places,
                kind: self.kind,
            },
            None => SamplingStrategy::Range {
                lower: self.lower,
                upper: self.upper,
                exclude_lower: self.lower_exclusive,
                exclude_upper: self.upper_exclusive,
                decimal_places: self.decimal_places,
                kind: self.kind,
            },
        }
    }

    // =========================================================================
    // Tree walker mutations
    // =========================================================================

    /// Apply `x <= threshold` (the true branch of a split).
    ///
    /// The tighter bound wins; on a tie the inclusive flag of this split is
    /// kept.
    pub(crate) fn constrain_upper(&mut self, threshold: f64) {
        let tighter = match self.upper {
            Bound::Unbounded => true,
            Bound::Finite(u) => threshold <= u,
        };
        if tighter {
            self.upper = Bound::Finite(threshold);
            self.upper_exclusive = false;
            self.upper_from_tree = true;
        }
    }

    /// Apply `x > threshold` (the false branch of a split).
    pub(crate) fn constrain_lower(&mut self, threshold: f64) {
        let tighter = match self.lower {
            Bound::Unbounded => true,
            Bound::Finite(l) => threshold >= l,
        };
        if tighter {
            self.lower = Bound::Finite(threshold);
            self.lower_exclusive = true;
            self.lower_from_tree = true;
        }
    }

    // =========================================================================
    // Precision and boundary pass mutations
    // =========================================================================

    pub(crate) fn set_kind(&mut self, kind: ValueKind) {
        self.kind = kind;
    }

    pub(crate) fn set_decimal_places(&mut self, decimal_places: u32) {
        self.decimal_places = decimal_places;
    }

    /// Replace a non-tree lower bound with an observed training extreme.
    pub(crate) fn backfill_lower(&mut self, value: f64) {
        debug_assert!(!self.lower_from_tree);
        self.lower = Bound::Finite(value);
        self.lower_exclusive = false;
    }

    /// Replace a non-tree upper bound with an observed training extreme.
    pub(crate) fn backfill_upper(&mut self, value: f64) {
        debug_assert!(!self.upper_from_tree);
        self.upper = Bound::Finite(value);
        self.upper_exclusive = false;
    }

    /// Store a quantized tree-derived lower bound.
    ///
    /// The value is strictly inside the split's admissible side, so it is
    /// included from now on.
    pub(crate) fn quantize_lower(&mut self, value: f64) {
        debug_assert!(self.lower_from_tree);
        self.lower = Bound::Finite(value);
        self.lower_exclusive = false;
        self.lower_quantized = true;
    }

    /// Store a quantized tree-derived upper bound.
    pub(crate) fn quantize_upper(&mut self, value: f64) {
        debug_assert!(self.upper_from_tree);
        self.upper = Bound::Finite(value);
        self.upper_exclusive = false;
        self.upper_quantized = true;
    }

    /// Collapse an inverted interval onto its lower bound.
    pub(crate) fn collapse_to_lower(&mut self) {
        self.upper = self.lower;
    }

    pub(crate) fn set_boundary(&mut self, zone: Option<BoundaryZone>) {
        self.boundary = zone;
    }
}
