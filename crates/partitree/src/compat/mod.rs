//! Compatibility layer for trees trained outside this crate.
//!
//! # scikit-learn
//!
//! Use [`sklearn::SklearnClassifier`] to load an exported
//! `DecisionTreeClassifier` and convert it to a native [`Tree`](crate::repr::Tree).
//!
//! ```ignore
//! use partitree::compat::sklearn::SklearnClassifier;
//!
//! let model: SklearnClassifier<String> = SklearnClassifier::from_json_str(&json)?;
//! let tree = model.to_tree()?;
//! ```

pub mod sklearn;

pub use sklearn::{SklearnClassifier, SklearnConversionError};
