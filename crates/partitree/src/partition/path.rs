//! Decision paths: one conjunctive predicate per tree leaf.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DeriveError;
use super::interval::FeatureInterval;
use crate::repr::NodeId;

/// Processing phase of a [`DecisionPath`].
///
/// The passes must run in order: walker (`Raw`), precision tightener
/// (`Tightened`), boundary deriver (`BoundaryDerived`). Each pass checks the
/// phase before touching a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathPhase {
    Raw,
    Tightened,
    BoundaryDerived,
}

impl fmt::Display for PathPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPhase::Raw => write!(f, "raw"),
            PathPhase::Tightened => write!(f, "tightened"),
            PathPhase::BoundaryDerived => write!(f, "boundary-derived"),
        }
    }
}

/// The predicate leading to one leaf, plus the class predicted there.
///
/// `intervals[i]` constrains feature `i`; features the path never splits on
/// stay unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPath<C> {
    predicted_class: C,
    leaf: NodeId,
    intervals: Vec<FeatureInterval>,
    satisfiable: bool,
    phase: PathPhase,
}

impl<C> DecisionPath<C> {
    pub(crate) fn new(predicted_class: C, leaf: NodeId, intervals: Vec<FeatureInterval>) -> Self {
        let satisfiable = intervals.iter().all(FeatureInterval::is_satisfiable);
        Self {
            predicted_class,
            leaf,
            intervals,
            satisfiable,
            phase: PathPhase::Raw,
        }
    }

    #[inline]
    pub fn predicted_class(&self) -> &C {
        &self.predicted_class
    }

    /// The leaf this path terminates at.
    #[inline]
    pub fn leaf(&self) -> NodeId {
        self.leaf
    }

    #[inline]
    pub fn intervals(&self) -> &[FeatureInterval] {
        &self.intervals
    }

    /// Interval of one feature.
    ///
    /// # Panics
    ///
    /// Panics if `feature` is out of range.
    #[inline]
    pub fn interval(&self, feature: usize) -> &FeatureInterval {
        &self.intervals[feature]
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.intervals.len()
    }

    #[inline]
    pub fn phase(&self) -> PathPhase {
        self.phase
    }

    /// Whether some sample can satisfy the split conditions of this path.
    ///
    /// Contradicting splits on the same feature (say `x <= 1` below
    /// `x > 2`) make a leaf unreachable. Recorded when the path is walked.
    #[inline]
    pub fn is_satisfiable(&self) -> bool {
        self.satisfiable
    }

    /// Number of features constrained by at least one split.
    pub fn n_constrained(&self) -> usize {
        self.intervals.iter().filter(|i| i.is_constrained()).count()
    }

    /// Whether `sample` satisfies every interval of this path.
    ///
    /// On a `Raw` path this is exactly the tree's routing predicate.
    pub fn matches(&self, sample: &[f64]) -> bool {
        debug_assert_eq!(sample.len(), self.intervals.len());
        self.intervals
            .iter()
            .zip(sample)
            .all(|(interval, &x)| interval.contains(x))
    }

    pub(crate) fn intervals_mut(&mut self) -> &mut [FeatureInterval] {
        &mut self.intervals
    }

    /// Check that this path may enter a pass accepting `accepted` phases.
    pub(crate) fn check_phase(
        &self,
        index: usize,
        accepted: &[PathPhase],
        expected: &'static str,
    ) -> Result<(), DeriveError> {
        if accepted.contains(&self.phase) {
            Ok(())
        } else {
            Err(DeriveError::PhaseOrder {
                path: index,
                expected,
                found: self.phase,
            })
        }
    }

    pub(crate) fn advance(&mut self, phase: PathPhase) {
        debug_assert!(phase >= self.phase);
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_with(intervals: Vec<FeatureInterval>) -> DecisionPath<&'static str> {
        DecisionPath::new("a", 1, intervals)
    }

    #[test]
    fn matches_respects_all_features() {
        let mut x0 = FeatureInterval::unbounded(0);
        x0.constrain_upper(1.0);
        let mut x1 = FeatureInterval::unbounded(1);
        x1.constrain_lower(-1.0);
        let path = path_with(vec![x0, x1]);

        assert!(path.matches(&[1.0, 0.0]));
        assert!(!path.matches(&[1.5, 0.0]));
        assert!(!path.matches(&[0.0, -1.0]));
        assert_eq!(path.n_constrained(), 2);
        assert_eq!(path.phase(), PathPhase::Raw);
        assert!(path.is_satisfiable());
    }

    #[test]
    fn contradicting_splits_are_unsatisfiable() {
        let mut x0 = FeatureInterval::unbounded(0);
        x0.constrain_lower(2.0);
        x0.constrain_upper(1.0);
        let path = path_with(vec![x0]);
        assert!(!path.is_satisfiable());
    }

    #[test]
    fn phase_checks() {
        let mut path = path_with(vec![FeatureInterval::unbounded(0)]);
        assert!(path.check_phase(0, &[PathPhase::Raw], "raw").is_ok());

        path.advance(PathPhase::Tightened);
        assert_eq!(
            path.check_phase(4, &[PathPhase::Raw], "raw"),
            Err(DeriveError::PhaseOrder {
                path: 4,
                expected: "raw",
                found: PathPhase::Tightened,
            })
        );
        assert_eq!(PathPhase::BoundaryDerived.to_string(), "boundary-derived");
    }
}
