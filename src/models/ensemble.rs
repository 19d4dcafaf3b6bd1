//! Gradient-boosted tree ensemble: JSON artifact format and inference.
//!
//! The artifact is a flat, index-linked node list per tree:
//!
//! ```json
//! {
//!   "format": "credisense-tree-ensemble",
//!   "version": 1,
//!   "profile": "direct",
//!   "n_features": 12,
//!   "feature_names": ["Age_Oldest_TL", "..."],
//!   "classes": [1, 2, 3],
//!   "base_score": [0.0, 0.0, 0.0],
//!   "trees": [
//!     {
//!       "class_index": 0,
//!       "nodes": [
//!         {"feature": 0, "threshold": 10.5, "left": 1, "right": 2, "missing_left": true},
//!         {"leaf": -0.2},
//!         {"leaf": 0.4}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Scoring follows multi-class boosting (`multi:softprob`): each class margin is
//! its base score plus the leaf values of the trees assigned to it; the label is
//! the class with the largest margin (first wins on ties).
//!
//! Traversal rule: `x < threshold` goes left, NaN follows `missing_left`.
//! Validation requires children to have a larger index than their parent, so
//! traversal always terminates.

use serde::{Deserialize, Serialize};

use crate::domain::Profile;
use crate::models::Classifier;

/// Expected value of the `format` field.
pub const FORMAT_TAG: &str = "credisense-tree-ensemble";

/// Supported artifact version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub format: String,
    pub version: u32,
    /// Profile the model was trained for, when recorded by the exporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub classes: Vec<i64>,
    /// Initial margin per class. Empty means all zeros.
    #[serde(default)]
    pub base_score: Vec<f64>,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub class_index: usize,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        missing_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

impl Node {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Node::Split {
            feature,
            threshold,
            left,
            right,
            missing_left: false,
        }
    }

    pub fn leaf(value: f64) -> Self {
        Node::Leaf { leaf: value }
    }
}

/// Structural problems found while validating an artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum EnsembleError {
    Format(String),
    Version(u32),
    NoClasses,
    DuplicateClass(i64),
    BaseScoreLen { expected: usize, actual: usize },
    FeatureNamesLen { expected: usize, actual: usize },
    NoTrees,
    EmptyTree { tree: usize },
    ClassIndex { tree: usize, class_index: usize },
    ChildIndex { tree: usize, node: usize, child: usize },
    FeatureIndex { tree: usize, node: usize, feature: usize },
    NonFiniteValue { tree: usize, node: usize },
}

impl std::fmt::Display for EnsembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnsembleError::Format(tag) => {
                write!(f, "unsupported artifact format '{tag}' (expected '{FORMAT_TAG}')")
            }
            EnsembleError::Version(v) => {
                write!(f, "unsupported artifact version {v} (expected {FORMAT_VERSION})")
            }
            EnsembleError::NoClasses => write!(f, "artifact declares no classes"),
            EnsembleError::DuplicateClass(c) => write!(f, "class label {c} is declared twice"),
            EnsembleError::BaseScoreLen { expected, actual } => {
                write!(f, "base_score has {actual} entries, expected {expected}")
            }
            EnsembleError::FeatureNamesLen { expected, actual } => {
                write!(f, "feature_names has {actual} entries, expected {expected}")
            }
            EnsembleError::NoTrees => write!(f, "artifact contains no trees"),
            EnsembleError::EmptyTree { tree } => write!(f, "tree {tree} has no nodes"),
            EnsembleError::ClassIndex { tree, class_index } => {
                write!(f, "tree {tree} targets class index {class_index}, which does not exist")
            }
            EnsembleError::ChildIndex { tree, node, child } => write!(
                f,
                "tree {tree} node {node} points to child {child}; children must follow their parent"
            ),
            EnsembleError::FeatureIndex { tree, node, feature } => {
                write!(f, "tree {tree} node {node} splits on feature {feature}, out of range")
            }
            EnsembleError::NonFiniteValue { tree, node } => {
                write!(f, "tree {tree} node {node} holds a non-finite value")
            }
        }
    }
}

impl std::error::Error for EnsembleError {}

impl TreeEnsemble {
    /// Check every structural invariant inference relies on.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        if self.format != FORMAT_TAG {
            return Err(EnsembleError::Format(self.format.clone()));
        }
        if self.version != FORMAT_VERSION {
            return Err(EnsembleError::Version(self.version));
        }
        if self.classes.is_empty() {
            return Err(EnsembleError::NoClasses);
        }
        for (i, c) in self.classes.iter().enumerate() {
            if self.classes[..i].contains(c) {
                return Err(EnsembleError::DuplicateClass(*c));
            }
        }
        if !self.base_score.is_empty() && self.base_score.len() != self.classes.len() {
            return Err(EnsembleError::BaseScoreLen {
                expected: self.classes.len(),
                actual: self.base_score.len(),
            });
        }
        if let Some(names) = &self.feature_names
            && names.len() != self.n_features
        {
            return Err(EnsembleError::FeatureNamesLen {
                expected: self.n_features,
                actual: names.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(EnsembleError::NoTrees);
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(EnsembleError::EmptyTree { tree: t });
            }
            if tree.class_index >= self.classes.len() {
                return Err(EnsembleError::ClassIndex {
                    tree: t,
                    class_index: tree.class_index,
                });
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                match *node {
                    Node::Leaf { leaf } => {
                        if !leaf.is_finite() {
                            return Err(EnsembleError::NonFiniteValue { tree: t, node: n });
                        }
                    }
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        ..
                    } => {
                        if feature >= self.n_features {
                            return Err(EnsembleError::FeatureIndex {
                                tree: t,
                                node: n,
                                feature,
                            });
                        }
                        if !threshold.is_finite() {
                            return Err(EnsembleError::NonFiniteValue { tree: t, node: n });
                        }
                        for child in [left, right] {
                            if child <= n || child >= tree.nodes.len() {
                                return Err(EnsembleError::ChildIndex {
                                    tree: t,
                                    node: n,
                                    child,
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn base_margin(&self, class: usize) -> f64 {
        self.base_score.get(class).copied().unwrap_or(0.0)
    }
}

impl Tree {
    /// Walk from the root to a leaf.
    ///
    /// Out-of-range links or features and cycles are reported as errors, so an
    /// ensemble that skipped [`TreeEnsemble::validate`] still cannot panic or hang.
    pub fn leaf_value(&self, row: &[f64]) -> Result<f64, String> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| format!("node index {idx} out of range"))?;
            match *node {
                Node::Leaf { leaf } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_left,
                } => {
                    let x = *row
                        .get(feature)
                        .ok_or_else(|| format!("node {idx} splits on missing feature {feature}"))?;
                    idx = if x.is_nan() {
                        if missing_left { left } else { right }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
        Err(format!(
            "no leaf reached within {} steps; tree links form a cycle",
            self.nodes.len()
        ))
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn profile(&self) -> Option<Profile> {
        self.profile
    }

    fn class_scores(&self, row: &[f64]) -> Result<Vec<f64>, String> {
        if row.len() != self.n_features {
            return Err(format!(
                "model expects {} features, got {}",
                self.n_features,
                row.len()
            ));
        }
        let mut margins: Vec<f64> = (0..self.classes.len()).map(|c| self.base_margin(c)).collect();
        for (t, tree) in self.trees.iter().enumerate() {
            let value = tree.leaf_value(row).map_err(|e| format!("tree {t}: {e}"))?;
            let margin = margins
                .get_mut(tree.class_index)
                .ok_or_else(|| format!("tree {t}: class index {} out of range", tree.class_index))?;
            *margin += value;
        }
        if let Some(bad) = margins.iter().position(|m| !m.is_finite()) {
            return Err(format!("non-finite margin for class {}", self.classes[bad]));
        }
        Ok(margins)
    }
}

/// Numerically stable softmax.
pub fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
