//! Partition derivation configuration with builder pattern.
//!
//! [`PartitionConfig`] uses the `bon` crate for builder generation; the
//! public `build()` validates the values once, before any tree is walked.
//!
//! # Example
//!
//! ```
//! use partitree::partition::PartitionConfig;
//!
//! let config = PartitionConfig::builder()
//!     .boundary_value_percentage(10.0)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! assert!(!config.treat_as_decimal);
//! ```

use bon::Builder;

use crate::data::FeatureStats;
use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The boundary percentage must be a finite value in [0, 100].
    #[error("boundary_value_percentage must be in [0, 100], got {0}")]
    InvalidBoundaryPercentage(f64),

    /// Boundary side selection needs an explicit seed.
    #[error("a random seed is required for boundary derivation")]
    MissingSeed,

    /// One statistics entry is required per feature.
    #[error("expected statistics for {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Observed range is not finite or inverted.
    #[error("feature {feature} has invalid observed range [{min}, {max}]")]
    InvalidFeatureStats { feature: usize, min: f64, max: f64 },
}

/// Check that `percentage` is usable as a boundary width.
pub(crate) fn validate_percentage(percentage: f64) -> Result<(), ConfigError> {
    if percentage.is_finite() && (0.0..=100.0).contains(&percentage) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBoundaryPercentage(percentage))
    }
}

/// Check one statistics entry per feature, each with a valid range.
pub(crate) fn validate_stats(stats: &[FeatureStats], n_features: usize) -> Result<(), ConfigError> {
    if stats.len() != n_features {
        return Err(ConfigError::FeatureCountMismatch {
            expected: n_features,
            actual: stats.len(),
        });
    }
    match stats.iter().position(|s| !s.is_valid()) {
        Some(feature) => Err(ConfigError::InvalidFeatureStats {
            feature,
            min: stats[feature].min,
            max: stats[feature].max,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// PartitionConfig
// =============================================================================

/// Configuration of the derivation pipeline.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct PartitionConfig {
    /// Share of a path's interval width, in percent, reserved as the
    /// boundary zone. Default: 10.
    #[builder(default = 10.0)]
    pub boundary_value_percentage: f64,

    /// Seed for boundary side selection. Required.
    pub seed: Option<u64>,

    /// Whether downstream generators should draw decimals instead of
    /// floats. Carried through to the output; interval arithmetic is the
    /// same either way.
    #[builder(default)]
    pub treat_as_decimal: bool,

    /// Sequential or rayon-parallel passes. Output is identical.
    #[builder(default)]
    pub parallelism: Parallelism,
}

/// Custom finishing function that validates the config.
impl<S: partition_config_builder::IsComplete> PartitionConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the percentage is outside [0, 100] or the
    /// seed is missing.
    pub fn build(self) -> Result<PartitionConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PartitionConfig {
    /// Validate the configuration.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_percentage(self.boundary_value_percentage)?;
        if self.seed.is_none() {
            return Err(ConfigError::MissingSeed);
        }
        Ok(())
    }

    /// The validated seed.
    pub(crate) fn require_seed(&self) -> Result<u64, ConfigError> {
        self.seed.ok_or(ConfigError::MissingSeed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PartitionConfig::builder().seed(7).build().unwrap();
        assert_eq!(config.boundary_value_percentage, 10.0);
        assert_eq!(config.seed, Some(7));
        assert!(!config.treat_as_decimal);
        assert_eq!(config.parallelism, Parallelism::Sequential);
    }

    #[test]
    fn test_missing_seed() {
        let result = PartitionConfig::builder().build();
        assert_eq!(result, Err(ConfigError::MissingSeed));
    }

    #[test]
    fn test_percentage_bounds() {
        for valid in [0.0, 0.5, 50.0, 100.0] {
            let result = PartitionConfig::builder()
                .seed(1)
                .boundary_value_percentage(valid)
                .build();
            assert!(result.is_ok(), "{valid} should be accepted");
        }

        for invalid in [-0.1, 100.1, f64::NAN, f64::INFINITY] {
            let result = PartitionConfig::builder()
                .seed(1)
                .boundary_value_percentage(invalid)
                .build();
            assert!(
                matches!(result, Err(ConfigError::InvalidBoundaryPercentage(_))),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_stats() {
        let stats = vec![FeatureStats::new(1, 0.0, 1.0), FeatureStats::new(0, 2.0, 2.0)];
        assert!(validate_stats(&stats, 2).is_ok());
        assert_eq!(
            validate_stats(&stats, 3),
            Err(ConfigError::FeatureCountMismatch {
                expected: 3,
                actual: 2
            })
        );

        let stats = vec![FeatureStats::new(1, 0.0, 1.0), FeatureStats::new(0, 3.0, 2.0)];
        assert!(matches!(
            validate_stats(&stats, 2),
            Err(ConfigError::InvalidFeatureStats { feature: 1, .. })
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::InvalidBoundaryPercentage(120.0).to_string(),
            "boundary_value_percentage must be in [0, 100], got 120"
        );
    }
}
