//! Errors surfaced by interval derivation.
//!
//! Degenerate intervals are not errors: they are absorbed by the precision
//! and boundary passes and show up only as unquantized bounds or absent
//! boundary zones.

use super::config::ConfigError;
use super::path::PathPhase;
use crate::repr::TreeValidationError;

/// Fatal error aborting the derivation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeriveError {
    /// The input tree is malformed.
    #[error("malformed decision tree: {0}")]
    Structural(#[from] TreeValidationError),

    /// The configuration or feature statistics are invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A pass was run on a path in the wrong phase.
    #[error("path {path} is {found}, expected {expected}")]
    PhaseOrder {
        path: usize,
        expected: &'static str,
        found: PathPhase,
    },
}
