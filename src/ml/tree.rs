use serde::{Deserialize, Serialize};

use crate::iris::FEATURE_COUNT;

/// One node of a flattened binary decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `features[feature] <= threshold`, otherwise to `right`.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Terminal node carrying a class index.
    Leaf { class: usize },
}

/// Decision tree stored as a node array rooted at index 0.
///
/// Children always sit at a higher index than their parent, which keeps the
/// structure acyclic and bounds every walk by the node count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Validate node links against the class count.
    pub fn validate(&self, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Decision tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(format!(
                            "Node {idx} splits on feature {feature} (expected < {FEATURE_COUNT})"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("Node {idx} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("Node {idx} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { class } => {
                    if class >= n_classes {
                        return Err(format!(
                            "Leaf {idx} predicts class {class} but model has {n_classes} classes"
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the tree from the root and return the leaf class.
    ///
    /// Returns `None` if a link points outside the node array.
    pub fn predict_class_index(&self, features: &[f32; FEATURE_COUNT]) -> Option<usize> {
        let mut idx = 0usize;
        for _ in 0..self.nodes.len() {
            match *self.nodes.get(idx)? {
                TreeNode::Leaf { class } => return Some(class),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = *features.get(feature)?;
                    idx = if value <= threshold { left } else { right };
                }
            }
        }
        None
    }
}
