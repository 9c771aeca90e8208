//! Mutable tree for node-by-node construction.
//!
//! Trainers and format converters fill a [`MutableTree`] and then
//! [`freeze`](MutableTree::freeze) it into an immutable [`Tree`].

use super::tree::{ClassLabel, Tree, TreeView};
use super::NodeId;

/// Tree under construction.
///
/// Nodes are either pre-allocated with
/// [`init_root_with_n_nodes`](Self::init_root_with_n_nodes) (when the layout
/// comes from an external format) or grown with
/// [`apply_numeric_split`](Self::apply_numeric_split).
#[derive(Debug, Clone)]
pub struct MutableTree<C: ClassLabel> {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f64>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    is_leaf: Vec<bool>,
    leaf_classes: Vec<Option<C>>,
}

impl<C: ClassLabel> Default for MutableTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClassLabel> MutableTree<C> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            split_indices: Vec::with_capacity(capacity),
            split_thresholds: Vec::with_capacity(capacity),
            left_children: Vec::with_capacity(capacity),
            right_children: Vec::with_capacity(capacity),
            is_leaf: Vec::with_capacity(capacity),
            leaf_classes: Vec::with_capacity(capacity),
        }
    }

    /// Reset the tree to a single unfinished root node and return its id.
    pub fn init_root(&mut self) -> NodeId {
        self.init_root_with_n_nodes(1);
        0
    }

    /// Reset the tree to `n_nodes` unfinished nodes.
    ///
    /// Every node starts as a leaf without a class; nodes left in that state
    /// are reported by validation.
    pub fn init_root_with_n_nodes(&mut self, n_nodes: usize) {
        self.split_indices.clear();
        self.split_thresholds.clear();
        self.left_children.clear();
        self.right_children.clear();
        self.is_leaf.clear();
        self.leaf_classes.clear();

        for _ in 0..n_nodes {
            self.push_node();
        }
    }

    fn push_node(&mut self) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.leaf_classes.push(None);
        id
    }

    /// Turn `node` into a split with freshly allocated children.
    ///
    /// Returns `(left, right)`: samples with `x[feature] <= threshold` go left.
    pub fn apply_numeric_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f64,
    ) -> (NodeId, NodeId) {
        let left = self.push_node();
        let right = self.push_node();
        self.set_numeric_split(node, feature, threshold, left, right);
        (left, right)
    }

    /// Turn `node` into a split pointing at existing children.
    pub fn set_numeric_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    ) {
        let idx = node as usize;
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.is_leaf[idx] = false;
        self.leaf_classes[idx] = None;
    }

    /// Turn `node` into a leaf predicting `class`.
    pub fn make_leaf(&mut self, node: NodeId, class: C) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.leaf_classes[idx] = Some(class);
    }

    /// Finish construction.
    pub fn freeze(self) -> Tree<C> {
        Tree::new(
            self.split_indices,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.is_leaf,
            self.leaf_classes,
        )
    }
}

impl<C: ClassLabel> TreeView for MutableTree<C> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::validate_tree;

    #[test]
    fn grow_and_freeze() {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (left, right) = tree.apply_numeric_split(root, 2, 1.5);
        let (left_left, left_right) = tree.apply_numeric_split(left, 0, -3.0);
        tree.make_leaf(right, "r");
        tree.make_leaf(left_left, "ll");
        tree.make_leaf(left_right, "lr");

        assert_eq!((left, right), (1, 2));
        assert_eq!((left_left, left_right), (3, 4));
        assert!(validate_tree(&tree).is_ok());

        let frozen = tree.freeze();
        assert_eq!(*frozen.predict_row(&[-4.0, 0.0, 1.5]), "ll");
        assert_eq!(*frozen.predict_row(&[0.0, 0.0, 1.5]), "lr");
        assert_eq!(*frozen.predict_row(&[0.0, 0.0, 1.6]), "r");
    }

    #[test]
    fn unfinished_nodes_fail_validation() {
        let mut tree = MutableTree::<u8>::new();
        let root = tree.init_root();
        let (left, _right) = tree.apply_numeric_split(root, 0, 0.0);
        tree.make_leaf(left, 1);

        assert!(matches!(
            validate_tree(&tree),
            Err(crate::repr::TreeValidationError::MissingLeafClass { node: 2 })
        ));
    }

    #[test]
    fn traverse_on_mutable_tree() {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (left, right) = tree.apply_numeric_split(root, 0, 0.5);
        tree.make_leaf(left, -1i32);
        tree.make_leaf(right, 1i32);

        assert!(!TreeView::is_leaf(&tree, 0));
        assert_eq!(TreeView::split_threshold(&tree, 0), 0.5);
        assert_eq!(tree.traverse_to_leaf(&[0.3]), left);
        assert_eq!(tree.traverse_to_leaf(&[0.7]), right);
    }
}
