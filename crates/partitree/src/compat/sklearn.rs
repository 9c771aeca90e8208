//! scikit-learn decision tree export.
//!
//! A fitted `DecisionTreeClassifier` keeps its structure in the flat
//! `tree_` arrays. The exporter on the Python side dumps them as JSON:
//!
//! ```json
//! {
//!   "classes": ["A", "B"],
//!   "n_features": 1,
//!   "tree": {
//!     "children_left": [1, -1, -1],
//!     "children_right": [2, -1, -1],
//!     "feature": [0, -2, -2],
//!     "threshold": [5.0, -2.0, -2.0],
//!     "value": [[[3, 3]], [[3, 0]], [[0, 3]]]
//!   }
//! }
//! ```
//!
//! `value` may also be given without the output axis (`[[3, 3], ...]`).
//! A leaf predicts the class with the highest count; ties go to the lower
//! class index, as in `predict`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::repr::{ClassLabel, MutableTree, Tree};

/// Child index scikit-learn uses for "no child".
pub const TREE_LEAF: i64 = -1;

/// Error type for scikit-learn model conversion.
#[derive(Debug, thiserror::Error)]
pub enum SklearnConversionError {
    #[error("failed to parse model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("array `{field}` has {actual} entries but the tree has {expected} nodes")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("node {node} references child {child} but tree has {n_nodes} nodes")]
    InvalidNodeIndex {
        node: usize,
        child: i64,
        n_nodes: usize,
    },
    #[error("split node {node} has invalid feature index {feature}")]
    InvalidFeature { node: usize, feature: i64 },
    #[error("leaf {node} has no class counts for {n_classes} classes")]
    InvalidLeafValues { node: usize, n_classes: usize },
}

// =============================================================================
// JSON Model
// =============================================================================

/// Per-node class counts, with or without the output axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeValues {
    /// `[n_nodes][n_outputs][n_classes]`, as stored by `tree_.value`.
    PerOutput(Vec<Vec<Vec<f64>>>),
    /// `[n_nodes][n_classes]`.
    Flat(Vec<Vec<f64>>),
}

impl NodeValues {
    pub fn len(&self) -> usize {
        match self {
            NodeValues::PerOutput(v) => v.len(),
            NodeValues::Flat(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class counts of the first output at `node`.
    fn counts(&self, node: usize) -> Option<&[f64]> {
        match self {
            NodeValues::PerOutput(v) => v.get(node)?.first().map(Vec::as_slice),
            NodeValues::Flat(v) => v.get(node).map(Vec::as_slice),
        }
    }
}

/// The flat `tree_` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SklearnTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: NodeValues,
}

impl SklearnTree {
    pub fn n_nodes(&self) -> usize {
        self.children_left.len()
    }
}

/// A fitted classifier: class labels plus its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SklearnClassifier<C> {
    /// Labels in `classes_` order; leaf counts index into this.
    pub classes: Vec<C>,
    /// Width of the training feature matrix (`n_features_in_`).
    pub n_features: usize,
    pub tree: SklearnTree,
}

impl<C: ClassLabel + DeserializeOwned> SklearnClassifier<C> {
    /// Parse an exported classifier.
    pub fn from_json_str(json: &str) -> Result<Self, SklearnConversionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse an exported classifier from a reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, SklearnConversionError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl<C: ClassLabel> SklearnClassifier<C> {
    /// Convert to a native [`Tree`].
    ///
    /// Node ids are kept, so `Tree` node `i` is `tree_` node `i`.
    pub fn to_tree(&self) -> Result<Tree<C>, SklearnConversionError> {
        let sk = &self.tree;
        let n_nodes = sk.n_nodes();
        if n_nodes == 0 {
            return Err(SklearnConversionError::EmptyTree);
        }

        for (field, actual) in [
            ("children_right", sk.children_right.len()),
            ("feature", sk.feature.len()),
            ("threshold", sk.threshold.len()),
            ("value", sk.value.len()),
        ] {
            if actual != n_nodes {
                return Err(SklearnConversionError::LengthMismatch {
                    field,
                    expected: n_nodes,
                    actual,
                });
            }
        }

        let mut tree = MutableTree::with_capacity(n_nodes);
        tree.init_root_with_n_nodes(n_nodes);

        for node in 0..n_nodes {
            let left = sk.children_left[node];
            let right = sk.children_right[node];

            if left == TREE_LEAF {
                let class = sk
                    .value
                    .counts(node)
                    .and_then(argmax)
                    .and_then(|idx| self.classes.get(idx))
                    .ok_or(SklearnConversionError::InvalidLeafValues {
                        node,
                        n_classes: self.classes.len(),
                    })?;
                tree.make_leaf(node as u32, class.clone());
                continue;
            }

            for child in [left, right] {
                if child < 0 || child as usize >= n_nodes {
                    return Err(SklearnConversionError::InvalidNodeIndex {
                        node,
                        child,
                        n_nodes,
                    });
                }
            }

            let feature = sk.feature[node];
            if feature < 0 || feature as usize >= self.n_features {
                return Err(SklearnConversionError::InvalidFeature { node, feature });
            }

            tree.set_numeric_split(
                node as u32,
                feature as u32,
                sk.threshold[node],
                left as u32,
                right as u32,
            );
        }

        Ok(tree.freeze())
    }
}

/// Index of the largest count, first index on ties.
fn argmax(counts: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        match best {
            Some((_, top)) if count <= top => {}
            _ if count.is_nan() => {}
            _ => best = Some((idx, count)),
        }
    }
    best.map(|(idx, _)| idx)
}
