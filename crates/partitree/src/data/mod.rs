//! Training-data inputs for interval derivation.
//!
//! The path walker only needs the tree; the precision tightener additionally
//! needs per-feature statistics of the training set ([`FeatureStats`]).
//! Sample matrices are sample-major `ndarray` views `[n_samples, n_features]`.
//! Missing values are `f64::NAN` and are ignored by the statistics.

mod stats;

pub use stats::{decimal_places, FeatureStats, StatsError, ValueKind};
