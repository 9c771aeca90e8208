//! Per-feature statistics of the training data.
//!
//! The precision tightener needs, for each feature, the number of decimal
//! places observed in the training data and the observed value range. These
//! are normally computed once by the dataset loader; [`FeatureStats::from_samples`]
//! does the same from an in-memory sample matrix.

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Numeric kind of a feature.
///
/// Informs whether downstream value generation draws integers or floats;
/// interval arithmetic is the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueKind {
    /// Every observed value is integral.
    Integer,
    /// At least one observed value has a fractional part.
    #[default]
    Float,
}

/// Errors from computing feature statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// The sample matrix has no rows.
    #[error("cannot compute statistics from zero samples")]
    NoSamples,
    /// A feature column holds no finite value.
    #[error("feature {feature} has no finite values")]
    NoFiniteValues { feature: usize },
}

/// Statistics of one feature over the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Maximum number of fractional digits over all observed values.
    pub decimal_places: u32,
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Integer or float.
    pub kind: ValueKind,
}

impl FeatureStats {
    /// Create statistics from known values.
    ///
    /// The kind is [`ValueKind::Integer`] when `decimal_places == 0`.
    pub fn new(decimal_places: u32, min: f64, max: f64) -> Self {
        let kind = if decimal_places == 0 {
            ValueKind::Integer
        } else {
            ValueKind::Float
        };
        Self {
            decimal_places,
            min,
            max,
            kind,
        }
    }

    /// Override the value kind.
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check that `min <= max` and both are finite.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Compute statistics of a single feature column.
    ///
    /// Non-finite values are ignored. Returns `None` if no finite value
    /// remains.
    pub fn from_column(values: ArrayView1<'_, f64>) -> Option<Self> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite()).peekable();
        finite.peek()?;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut places = 0;
        for v in finite {
            min = min.min(v);
            max = max.max(v);
            places = places.max(decimal_places(v));
        }

        Some(Self::new(places, min, max))
    }

    /// Compute statistics of every column of a sample-major matrix
    /// `[n_samples, n_features]`.
    pub fn from_samples(samples: ArrayView2<'_, f64>) -> Result<Vec<Self>, StatsError> {
        if samples.nrows() == 0 {
            return Err(StatsError::NoSamples);
        }

        samples
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(feature, column)| {
                Self::from_column(column).ok_or(StatsError::NoFiniteValues { feature })
            })
            .collect()
    }
}

/// Number of fractional digits in the shortest decimal form of `value`.
///
/// Uses the shortest round-trip representation, so `0.1` has one decimal
/// place even though its binary value is not exactly one tenth.
/// Non-finite values have zero decimal places.
pub fn decimal_places(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }

    let repr = value.to_string();
    match repr.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len() as u32,
        None => 0,
    }
}
