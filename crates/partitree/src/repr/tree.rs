//! Canonical classification tree (SoA) and read-only tree interface.
//!
//! This module provides:
//! - [`Tree`]: Immutable SoA tree storage for traversal and path extraction
//! - [`TreeView`]: Read-only trait for unified tree access
//! - [`TreeValidationError`]: Structural validation errors
//!
//! For node-by-node construction, see [`super::mutable_tree::MutableTree`].

use std::fmt::Debug;
use std::hash::Hash;

use ndarray::ArrayView2;

use super::NodeId;

// ============================================================================
// ClassLabel
// ============================================================================

/// A label predicted at a tree leaf.
///
/// Any hashable, comparable value works: integer class indices, `&'static str`
/// in tests, or `String` labels read from a trainer's export.
pub trait ClassLabel: Clone + Debug + PartialEq + Eq + Hash + Send + Sync {}

impl<T> ClassLabel for T where T: Clone + Debug + PartialEq + Eq + Hash + Send + Sync {}

// ============================================================================
// TreeView Trait
// ============================================================================

/// Read-only view of a binary classification tree.
///
/// Split semantics follow the usual trainer convention: a sample goes to the
/// left ("true") child when `x[feature] <= threshold`, and to the right
/// ("false") child otherwise.
///
/// # Example
///
/// ```ignore
/// use partitree::repr::TreeView;
///
/// fn count_splits<T: TreeView>(tree: &T) -> usize {
///     (0..tree.n_nodes())
///         .filter(|&n| !tree.is_leaf(n as u32))
///         .count()
/// }
/// ```
pub trait TreeView {
    /// The class label type stored at leaves.
    type Class: ClassLabel;

    /// Number of nodes in the tree.
    fn n_nodes(&self) -> usize;

    /// Check if a node is a leaf.
    fn is_leaf(&self, node: NodeId) -> bool;

    /// Get the feature index for a split node.
    fn split_index(&self, node: NodeId) -> u32;

    /// Get the split threshold for a split node.
    fn split_threshold(&self, node: NodeId) -> f64;

    /// Get the left (`<=`) child node index.
    fn left_child(&self, node: NodeId) -> NodeId;

    /// Get the right (`>`) child node index.
    fn right_child(&self, node: NodeId) -> NodeId;

    /// Get the predicted class of a leaf, `None` for split nodes.
    fn leaf_class(&self, node: NodeId) -> Option<&Self::Class>;

    /// Number of leaf nodes.
    fn n_leaves(&self) -> usize {
        (0..self.n_nodes())
            .filter(|&n| self.is_leaf(n as NodeId))
            .count()
    }

    /// One past the highest feature index any split uses; 0 for a tree
    /// without splits.
    fn n_features_used(&self) -> usize {
        (0..self.n_nodes())
            .filter(|&n| !self.is_leaf(n as NodeId))
            .map(|n| self.split_index(n as NodeId) as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Traverse the tree to find the leaf node for a sample.
    ///
    /// NaN never satisfies `<=`, so missing values follow the right child.
    #[inline]
    fn traverse_to_leaf(&self, sample: &[f64]) -> NodeId {
        let mut node = 0;

        while !self.is_leaf(node) {
            let fvalue = sample[self.split_index(node) as usize];
            node = if fvalue <= self.split_threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }

        node
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for a [`TreeView`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,
    /// Tree has nodes but none of them is a leaf.
    #[error("tree has {n_nodes} nodes but no leaves")]
    NoLeaves { n_nodes: usize },
    /// A child pointer references an out-of-bounds node.
    #[error("node {node} has {side} child {child} but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node references itself as a child.
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path (DAG).
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },
    /// A cycle was detected during traversal.
    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },
    /// A node exists in storage but is unreachable from the root.
    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },
    /// A leaf carries no predicted class.
    #[error("leaf {node} has no predicted class")]
    MissingLeafClass { node: NodeId },
    /// A split threshold is NaN or infinite.
    #[error("split node {node} has non-finite threshold {threshold}")]
    NonFiniteThreshold { node: NodeId, threshold: f64 },
    /// A split references a feature outside the feature vector.
    #[error("split node {node} uses feature {feature} but samples have {n_features} features")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

/// Validate the structural invariants of any tree.
///
/// Checks that the tree is non-empty, has at least one leaf, is a proper
/// tree (no self-loops, cycles or shared subtrees), that every stored node is
/// reachable from the root, that every leaf has a class and that every split
/// threshold is finite.
pub fn validate_tree<T: TreeView + ?Sized>(tree: &T) -> Result<(), TreeValidationError> {
    let n_nodes = tree.n_nodes();
    if n_nodes == 0 {
        return Err(TreeValidationError::EmptyTree);
    }
    if tree.n_leaves() == 0 {
        return Err(TreeValidationError::NoLeaves { n_nodes });
    }

    // Iterative DFS with color marking.
    // 0 = unvisited, 1 = visiting, 2 = done
    let mut color = vec![0u8; n_nodes];
    let mut stack: Vec<(NodeId, u8)> = vec![(0, 0)];

    while let Some((node, phase)) = stack.pop() {
        let node_usize = node as usize;

        match phase {
            0 => {
                match color[node_usize] {
                    0 => {}
                    1 => return Err(TreeValidationError::CycleDetected { node }),
                    _ => return Err(TreeValidationError::DuplicateVisit { node }),
                }

                color[node_usize] = 1;
                stack.push((node, 1));

                if tree.is_leaf(node) {
                    if tree.leaf_class(node).is_none() {
                        return Err(TreeValidationError::MissingLeafClass { node });
                    }
                    continue;
                }

                let threshold = tree.split_threshold(node);
                if !threshold.is_finite() {
                    return Err(TreeValidationError::NonFiniteThreshold { node, threshold });
                }

                let left = tree.left_child(node);
                let right = tree.right_child(node);

                if left == node || right == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
                for (side, child) in [("left", left), ("right", right)] {
                    if child as usize >= n_nodes {
                        return Err(TreeValidationError::ChildOutOfBounds {
                            node,
                            side,
                            child,
                            n_nodes,
                        });
                    }
                }

                // Visit children
                stack.push((right, 0));
                stack.push((left, 0));
            }
            _ => {
                color[node_usize] = 2;
            }
        }
    }

    match color.iter().position(|&c| c == 0) {
        Some(i) => Err(TreeValidationError::UnreachableNode { node: i as NodeId }),
        None => Ok(()),
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Structure-of-Arrays classification tree.
///
/// Stores tree nodes in flat arrays. Child indices are local to this tree
/// (0 = root).
#[derive(Debug, Clone)]
pub struct Tree<C: ClassLabel> {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f64]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    is_leaf: Box<[bool]>,
    leaf_classes: Box<[Option<C>]>,
}

impl<C: ClassLabel> Tree<C> {
    /// Create a new tree from parallel arrays.
    ///
    /// All arrays must have the same length (number of nodes). Split nodes
    /// carry `None` in `leaf_classes`; leaves ignore the split arrays.
    pub fn new(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f64>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        is_leaf: Vec<bool>,
        leaf_classes: Vec<Option<C>>,
    ) -> Self {
        let n_nodes = split_indices.len();
        debug_assert_eq!(n_nodes, split_thresholds.len());
        debug_assert_eq!(n_nodes, left_children.len());
        debug_assert_eq!(n_nodes, right_children.len());
        debug_assert_eq!(n_nodes, is_leaf.len());
        debug_assert_eq!(n_nodes, leaf_classes.len());

        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_classes: leaf_classes.into_boxed_slice(),
        }
    }

    /// Create a tree without any nodes.
    ///
    /// Such a tree fails validation; it exists so that malformed trainer
    /// output can be represented and rejected.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    /// Validate basic structural invariants for this tree.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        validate_tree(self)
    }

    /// Predict the class of a single sample.
    ///
    /// # Panics
    ///
    /// Panics if the tree is empty or the reached leaf has no class; call
    /// [`validate`](Self::validate) first for untrusted trees.
    pub fn predict_row(&self, features: &[f64]) -> &C {
        let leaf = self.traverse_to_leaf(features);
        self.leaf_classes[leaf as usize]
            .as_ref()
            .expect("validated tree leaves carry a class")
    }

    /// Predict the class of every row of a sample-major matrix.
    pub fn predict(&self, samples: ArrayView2<'_, f64>) -> Vec<C> {
        samples
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                self.predict_row(&row).clone()
            })
            .collect()
    }
}

// =============================================================================
// TreeView for Tree
// =============================================================================

impl<C: ClassLabel> TreeView for Tree<C> {
    type Class = C;

    #[inline]
    fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    fn split_threshold(&self, node: NodeId) -> f64 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    fn leaf_class(&self, node: NodeId) -> Option<&C> {
        self.leaf_classes[node as usize].as_ref()
    }
}
