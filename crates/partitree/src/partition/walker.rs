//! Decision path extraction.
//!
//! Walks a classification tree depth-first and emits one [`DecisionPath`]
//! per leaf, in pre-order left-to-right leaf order. The running interval
//! array is narrowed when descending into a child and restored when the
//! subtree is done, so the walk allocates only at leaves.

use tracing::debug;

use super::interval::FeatureInterval;
use super::path::DecisionPath;
use crate::repr::{NodeId, TreeValidationError, TreeView, validate_tree};

/// Branch of a split taken when descending.
#[derive(Debug, Clone, Copy)]
enum Branch {
    /// `x <= threshold`.
    Left,
    /// `x > threshold`.
    Right,
}

/// Pending work of the iterative traversal.
enum Step {
    Visit(NodeId),
    Constrain {
        feature: usize,
        threshold: f64,
        branch: Branch,
    },
    Restore {
        feature: usize,
        saved: FeatureInterval,
    },
}

/// Extracts decision paths from a tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeWalker {
    n_features: usize,
}

impl TreeWalker {
    /// Create a walker for samples with `n_features` features.
    pub fn new(n_features: usize) -> Self {
        Self { n_features }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Produce one `Raw` path per leaf.
    ///
    /// # Errors
    ///
    /// Any [`TreeValidationError`] from [`validate_tree`], or
    /// [`TreeValidationError::FeatureOutOfRange`] if a split uses a feature
    /// index `>= n_features`. No paths are returned on error.
    pub fn walk<T: TreeView>(
        &self,
        tree: &T,
    ) -> Result<Vec<DecisionPath<T::Class>>, TreeValidationError> {
        validate_tree(tree)?;

        let mut intervals: Vec<FeatureInterval> =
            (0..self.n_features).map(FeatureInterval::unbounded).collect();
        let mut paths = Vec::with_capacity(tree.n_leaves());
        let mut stack = vec![Step::Visit(0)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(node) => {
                    if tree.is_leaf(node) {
                        let Some(class) = tree.leaf_class(node) else {
                            return Err(TreeValidationError::MissingLeafClass { node });
                        };
                        paths.push(DecisionPath::new(class.clone(), node, intervals.clone()));
                        continue;
                    }

                    let raw_feature = tree.split_index(node);
                    let feature = raw_feature as usize;
                    if feature >= self.n_features {
                        return Err(TreeValidationError::FeatureOutOfRange {
                            node,
                            feature: raw_feature,
                            n_features: self.n_features,
                        });
                    }
                    let threshold = tree.split_threshold(node);
                    let saved = intervals[feature].clone();

                    // Popped in reverse: left subtree first, then right.
                    stack.push(Step::Restore {
                        feature,
                        saved: saved.clone(),
                    });
                    stack.push(Step::Visit(tree.right_child(node)));
                    stack.push(Step::Constrain {
                        feature,
                        threshold,
                        branch: Branch::Right,
                    });
                    stack.push(Step::Restore { feature, saved });
                    stack.push(Step::Visit(tree.left_child(node)));
                    stack.push(Step::Constrain {
                        feature,
                        threshold,
                        branch: Branch::Left,
                    });
                }
                Step::Constrain {
                    feature,
                    threshold,
                    branch,
                } => match branch {
                    Branch::Left => intervals[feature].constrain_upper(threshold),
                    Branch::Right => intervals[feature].constrain_lower(threshold),
                },
                Step::Restore { feature, saved } => intervals[feature] = saved,
            }
        }

        let unsatisfiable = paths.iter().filter(|p| !p.is_satisfiable()).count();
        debug!(
            n_nodes = tree.n_nodes(),
            n_paths = paths.len(),
            unsatisfiable,
            "Extracted decision paths"
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Bound, PathPhase};
    use crate::repr::Tree;

    #[test]
    fn single_leaf_tree() {
        let tree = crate::class_tree! {
            0 => leaf("only"),
        };
        let paths = TreeWalker::new(3).walk(&tree).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(*paths[0].predicted_class(), "only");
        assert_eq!(paths[0].n_features(), 3);
        assert_eq!(paths[0].n_constrained(), 0);
        assert_eq!(paths[0].phase(), PathPhase::Raw);
    }

    #[test]
    fn one_split() {
        let tree = crate::class_tree! {
            0 => split(0, 5.0) -> 1, 2,
            1 => leaf("A"),
            2 => leaf("B"),
        };
        let paths = TreeWalker::new(1).walk(&tree).unwrap();

        assert_eq!(paths.len(), 2);
        let a = paths[0].interval(0);
        assert_eq!(*paths[0].predicted_class(), "A");
        assert_eq!(paths[0].leaf(), 1);
        assert_eq!(a.lower(), Bound::Unbounded);
        assert_eq!(a.upper(), Bound::Finite(5.0));
        assert!(!a.upper_exclusive());

        let b = paths[1].interval(0);
        assert_eq!(*paths[1].predicted_class(), "B");
        assert_eq!(b.lower(), Bound::Finite(5.0));
        assert!(b.lower_exclusive());
        assert_eq!(b.upper(), Bound::Unbounded);
    }

    #[test]
    fn preorder_leaf_order_and_restore() {
        //         0: x0 <= 2
        //        /          \
        //  1: x0 <= 1     2: x1 <= 0
        //    /    \         /    \
        //   3      4       5      6
        let tree = crate::class_tree! {
            0 => split(0, 2.0) -> 1, 2,
            1 => split(0, 1.0) -> 3, 4,
            2 => split(1, 0.0) -> 5, 6,
            3 => leaf(3u8),
            4 => leaf(4u8),
            5 => leaf(5u8),
            6 => leaf(6u8),
        };
        let paths = TreeWalker::new(2).walk(&tree).unwrap();

        let leaves: Vec<_> = paths.iter().map(|p| p.leaf()).collect();
        assert_eq!(leaves, vec![3, 4, 5, 6]);

        // Leaf 4: 1 < x0 <= 2, x1 free.
        assert_eq!(paths[1].interval(0).lower(), Bound::Finite(1.0));
        assert_eq!(paths[1].interval(0).upper(), Bound::Finite(2.0));
        assert!(!paths[1].interval(1).is_constrained());

        // Leaf 5: the left subtree's x0 <= 1 must not leak.
        assert_eq!(paths[2].interval(0).lower(), Bound::Finite(2.0));
        assert_eq!(paths[2].interval(0).upper(), Bound::Unbounded);
        assert_eq!(paths[2].interval(1).upper(), Bound::Finite(0.0));
    }

    #[test]
    fn shared_classes_stay_distinct_paths() {
        let tree = crate::class_tree! {
            0 => split(0, 0.0) -> 1, 2,
            1 => leaf(1u8),
            2 => leaf(1u8),
        };
        assert_eq!(TreeWalker::new(1).walk(&tree).unwrap().len(), 2);
    }

    #[test]
    fn contradicting_splits_yield_unsatisfiable_path() {
        let tree = crate::class_tree! {
            0 => split(0, 2.0) -> 1, 2,
            1 => leaf(0u8),
            2 => split(0, 1.0) -> 3, 4,
            3 => leaf(1u8),
            4 => leaf(2u8),
        };
        let paths = TreeWalker::new(1).walk(&tree).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(!paths[1].is_satisfiable(), "x0 > 2 and x0 <= 1");
        assert!(paths[2].is_satisfiable());
    }

    #[test]
    fn feature_out_of_range() {
        let tree = crate::class_tree! {
            0 => split(4, 0.0) -> 1, 2,
            1 => leaf(0u8),
            2 => leaf(1u8),
        };
        assert_eq!(
            TreeWalker::new(2).walk(&tree).unwrap_err(),
            TreeValidationError::FeatureOutOfRange {
                node: 0,
                feature: 4,
                n_features: 2,
            }
        );
    }

    #[test]
    fn empty_tree_is_structural_error() {
        let tree: Tree<u8> = Tree::empty();
        assert_eq!(
            TreeWalker::new(1).walk(&tree).unwrap_err(),
            TreeValidationError::EmptyTree
        );
    }
}
