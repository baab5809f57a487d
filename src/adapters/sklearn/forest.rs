//! Random forest evaluator over exported decision trees.

use serde::{Deserialize, Serialize};

use crate::domain::PredictionError;
use crate::ports::Classifier;

/// One node of an exported tree.
///
/// Split nodes send `x[feature] <= threshold` to `left`. Leaves hold class
/// counts (or fractions) in the forest's class order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Normalized class distribution of the leaf reached by `x`.
    fn leaf_distribution(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

/// Fitted random forest: mean of per-tree leaf distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Check the tree structure.
    ///
    /// Child indices must point forward in the node array, which keeps every
    /// walk finite.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let k = self.classes.len();
        if k < 2 {
            return Err(format!("{k} classes, need at least 2"));
        }
        if self.n_features == 0 {
            return Err("n_features is 0".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {t} node {i}: non-finite threshold"));
                        }
                        for child in [left, right] {
                            if *child <= i || *child >= tree.nodes.len() {
                                return Err(format!(
                                    "tree {t} node {i}: child index {child} out of range"
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != k {
                            return Err(format!(
                                "tree {t} node {i}: leaf has {} values for {k} classes",
                                value.len()
                            ));
                        }
                        if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                            return Err(format!("tree {t} node {i}: invalid leaf value"));
                        }
                        if value.iter().sum::<f64>() <= 0.0 {
                            return Err(format!("tree {t} node {i}: empty leaf"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.n_features {
            return Err(PredictionError::DimensionMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_distribution(x);
            let total: f64 = leaf.iter().sum();
            for (acc, v) in proba.iter_mut().zip(leaf) {
                *acc += v / total;
            }
        }
        let n = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n;
        }
        Ok(proba)
    }

    fn name(&self) -> &str {
        "RandomForest"
    }
}
