//! partitree: test partitions from decision tree paths.
//!
//! Walks a trained classification tree, reconstructs the per-feature
//! interval predicate of every leaf, tightens those intervals to the
//! precision of the training data and derives seeded boundary-value zones
//! next to the split thresholds. A test generator draws inputs from the
//! resulting intervals and checks that the model under test predicts each
//! path's class.
//!
//! # Key Types
//!
//! - [`Tree`] / [`TreeView`] - Classification tree storage and access
//! - [`FeatureStats`] - Observed precision and range of each feature
//! - [`PartitionConfig`] - Configuration builder
//! - [`DecisionPath`] / [`FeatureInterval`] - Derived partitions
//!
//! # Deriving Partitions
//!
//! Use `PartitionConfig::builder()` to configure, then [`derive_partitions`].
//! See the [`partition`] module for the individual passes.
//!
//! # Loading scikit-learn Trees
//!
//! Use [`compat::sklearn::SklearnClassifier`] to load exported trees.

// Re-export approx traits for users who want to compare interval endpoints
pub use approx;

pub mod compat;
pub mod data;
pub mod partition;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Pipeline entry point and configuration
pub use partition::{DeriveError, PartitionConfig, PartitionSet, derive_partitions};

// Derived partition types
pub use partition::{Bound, BoundaryZone, DecisionPath, FeatureInterval, SamplingStrategy};

// Trees and data
pub use data::{FeatureStats, ValueKind};
pub use repr::{Tree, TreeView};

// Shared utilities
pub use utils::Parallelism;
