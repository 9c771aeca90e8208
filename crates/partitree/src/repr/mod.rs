//! Classification tree representations consumed by the path walker.
//!
//! - [`Tree`]: immutable SoA storage produced by a trainer or a converter
//! - [`MutableTree`]: node-by-node construction, frozen into a [`Tree`]
//! - [`TreeView`]: read-only interface both implement
//! - [`validate_tree`]: structural checks run before any path is derived

/// Node identifier.
///
/// Internally this is just an index into the tree's SoA arrays.
pub type NodeId = u32;

pub mod mutable_tree;
pub mod tree;

pub use mutable_tree::MutableTree;
pub use tree::{ClassLabel, Tree, TreeValidationError, TreeView, validate_tree};
