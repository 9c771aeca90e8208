//! Testing utilities for partitree.
//!
//! Tree construction macros and interval assertions shared by unit tests
//! and integration tests.
//!
//! ```ignore
//! use partitree::testing::{assert_bounds, DEFAULT_TOLERANCE};
//! ```

use approx::AbsDiffEq;

use crate::partition::{Bound, DecisionPath, FeatureInterval};

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for comparing interval endpoints.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Tree Construction
// =============================================================================

/// Build a [`Tree`](crate::repr::Tree) from a node table.
///
/// Every node is listed with its id. Splits send `x[feature] <= threshold`
/// to the first child.
///
/// ```
/// use partitree::repr::TreeView;
///
/// let tree = partitree::class_tree! {
///     0 => split(0, 0.5) -> 1, 2,
///     1 => leaf("low"),
///     2 => leaf("high"),
/// };
/// assert_eq!(tree.n_leaves(), 2);
/// ```
#[macro_export]
macro_rules! class_tree {
    (@node $tree:ident, $node:literal, split($feature:expr, $threshold:expr) -> $left:literal, $right:literal) => {
        $tree.set_numeric_split($node, $feature, $threshold, $left, $right);
    };
    (@node $tree:ident, $node:literal, leaf($class:expr)) => {
        $tree.make_leaf($node, $class);
    };
    ($($node:literal => $kind:ident ( $($args:tt)* ) $(-> $left:literal, $right:literal)?),+ $(,)?) => {{
        let mut tree = $crate::repr::MutableTree::new();
        let n_nodes = [$($node),+].len();
        tree.init_root_with_n_nodes(n_nodes);
        $( $crate::class_tree!(@node tree, $node, $kind($($args)*) $(-> $left, $right)?); )+
        tree.freeze()
    }};
}

// =============================================================================
// Interval Assertions
// =============================================================================

/// Whether an endpoint matches the expected value within `tolerance`.
fn bound_matches(actual: Bound, expected: Option<f64>, tolerance: f64) -> bool {
    match (actual.value(), expected) {
        (None, None) => true,
        (Some(a), Some(e)) => a.abs_diff_eq(&e, tolerance),
        _ => false,
    }
}

/// Assert both endpoints of an interval, `None` meaning unbounded.
///
/// # Panics
///
/// Panics with the full interval if either endpoint differs.
pub fn assert_bounds(interval: &FeatureInterval, lower: Option<f64>, upper: Option<f64>) {
    assert!(
        bound_matches(interval.lower(), lower, DEFAULT_TOLERANCE)
            && bound_matches(interval.upper(), upper, DEFAULT_TOLERANCE),
        "feature {}: expected [{lower:?}, {upper:?}], got {interval:?}",
        interval.feature()
    );
}

/// Assert the structural invariants every boundary-derived interval holds.
///
/// - finite bounds are ordered
/// - a present boundary zone is non-empty and lies inside the interval
/// - both zone endpoints satisfy the interval's predicate
/// - exactly one zone endpoint is anchored
pub fn assert_interval_invariants(interval: &FeatureInterval) {
    if let (Some(l), Some(u)) = (interval.lower().value(), interval.upper().value()) {
        assert!(l <= u, "feature {}: inverted interval {interval:?}", interval.feature());
    }

    if let Some(zone) = interval.boundary() {
        assert!(zone.lower < zone.upper, "empty zone {zone:?}");
        assert!(zone.lower_anchored != zone.upper_anchored, "zone anchoring {zone:?}");
        if let Some(l) = interval.lower().value() {
            assert!(l <= zone.lower, "zone {zone:?} below {interval:?}");
        }
        if let Some(u) = interval.upper().value() {
            assert!(zone.upper <= u, "zone {zone:?} above {interval:?}");
        }
        assert!(
            interval.contains(zone.lower) && interval.contains(zone.upper),
            "zone {zone:?} outside {interval:?}"
        );
    }
}

/// Assert [`assert_interval_invariants`] on every interval of a path, and
/// that a satisfiable path kept a non-empty domain on every feature.
pub fn assert_path_invariants<C>(path: &DecisionPath<C>) {
    for interval in path.intervals() {
        assert_interval_invariants(interval);
        if path.is_satisfiable() {
            assert!(interval.is_satisfiable(), "empty domain {interval:?}");
        }
    }
}
