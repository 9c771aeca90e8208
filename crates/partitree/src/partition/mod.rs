//! Test partition derivation from decision paths.
//!
//! Three passes run strictly in order over the paths of one tree:
//!
//! 1. [`TreeWalker`]: one [`DecisionPath`] per leaf with raw split intervals
//! 2. [`PrecisionTightener`]: bounds snapped to the training data precision
//! 3. [`BoundaryDeriver`]: seeded boundary zones next to split thresholds
//!
//! Each path carries a [`PathPhase`] tag; running a pass out of order is a
//! [`DeriveError::PhaseOrder`]. [`derive_partitions`] runs all three after
//! validating the configuration.
//!
//! # Example
//!
//! ```
//! use partitree::data::FeatureStats;
//! use partitree::partition::{derive_partitions, Bound, PartitionConfig};
//! use partitree::repr::MutableTree;
//!
//! let mut tree = MutableTree::new();
//! let root = tree.init_root();
//! let (left, right) = tree.apply_numeric_split(root, 0, 5.0);
//! tree.make_leaf(left, "A");
//! tree.make_leaf(right, "B");
//! let tree = tree.freeze();
//!
//! let stats = [FeatureStats::new(1, 0.0, 10.0)];
//! let config = PartitionConfig::builder().seed(42).build().unwrap();
//! let set = derive_partitions(&tree, &stats, &config).unwrap();
//!
//! assert_eq!(set.paths[0].interval(0).upper(), Bound::Finite(4.9));
//! assert_eq!(set.paths[1].interval(0).lower(), Bound::Finite(5.1));
//! ```

mod boundary;
mod config;
mod error;
mod interval;
mod path;
mod precision;
mod walker;

use serde::Serialize;
use tracing::debug;

pub use boundary::{BoundaryDeriver, BoundaryReport};
pub use config::{ConfigError, PartitionConfig};
pub use error::DeriveError;
pub use interval::{Anchor, Bound, BoundaryZone, FeatureInterval, SamplingStrategy};
pub use path::{DecisionPath, PathPhase};
pub use precision::{
    MAX_DECIMAL_PLACES, MAX_TIGHTENING_PRECISION, PrecisionTightener, TighteningReport,
    quantize_down, quantize_up, tighten_lower, tighten_upper, unit,
};
pub use walker::TreeWalker;

use crate::data::FeatureStats;
use crate::repr::TreeView;

/// Derived partitions of one tree, ready for a test generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSet<C> {
    /// One boundary-derived path per leaf, in pre-order leaf order.
    pub paths: Vec<DecisionPath<C>>,
    /// Whether generated values should be decimals rather than floats.
    pub treat_as_decimal: bool,
    pub boundary_value_percentage: f64,
    pub seed: u64,
}

impl<C> PartitionSet<C> {
    /// Paths whose split conditions some sample can satisfy.
    pub fn satisfiable_paths(&self) -> impl Iterator<Item = &DecisionPath<C>> {
        self.paths.iter().filter(|p| p.is_satisfiable())
    }
}

/// Run the walker, tightener and boundary deriver on `tree`.
///
/// `stats` holds one entry per feature and must cover every feature the
/// tree splits on.
///
/// # Errors
///
/// - [`DeriveError::Config`] for an invalid configuration or statistics,
///   checked before the tree is visited.
/// - [`DeriveError::Structural`] for a malformed tree.
pub fn derive_partitions<T: TreeView>(
    tree: &T,
    stats: &[FeatureStats],
    config: &PartitionConfig,
) -> Result<PartitionSet<T::Class>, DeriveError> {
    config.validate()?;
    let seed = config.require_seed()?;
    let n_features = stats.len().max(tree.n_features_used());
    config::validate_stats(stats, n_features)?;

    let mut paths = TreeWalker::new(stats.len()).walk(tree)?;

    PrecisionTightener::new(stats)
        .with_parallelism(config.parallelism)
        .tighten(&mut paths)?;

    BoundaryDeriver::new(config.boundary_value_percentage, seed)?
        .with_parallelism(config.parallelism)
        .derive(&mut paths)?;

    debug!(n_paths = paths.len(), seed, "Derived partitions");

    Ok(PartitionSet {
        paths,
        treat_as_decimal: config.treat_as_decimal,
        boundary_value_percentage: config.boundary_value_percentage,
        seed,
    })
}
