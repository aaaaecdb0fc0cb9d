use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DecisionTree, LogisticRegression, TreeNode};
use crate::iris::{FEATURE_COUNT, FEATURE_NAMES, IrisFeatures, Species};

/// Model file format version understood by this build.
pub const MODEL_VERSION: i64 = 1;

/// Errors raised while loading, saving or evaluating a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write model {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid model: {0}")]
    Invalid(String),
    #[error("Model could not classify the input: {0}")]
    Inference(String),
}

/// Classifier payload, tagged by `"type"` in the model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    DecisionTree(DecisionTree),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DecisionTree(_) => "decision_tree",
            Self::LogisticRegression(_) => "logistic_regression",
        }
    }
}

/// Versioned iris classifier loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrisModel {
    pub model_version: i64,
    #[serde(default)]
    pub model_id: Option<String>,
    /// Feature names in column order; must match [`FEATURE_NAMES`].
    pub feature_names: Vec<String>,
    /// Class names indexed by label.
    pub classes: Vec<String>,
    pub classifier: Classifier,
}

impl IrisModel {
    /// The CART tree commonly fitted on the full iris dataset.
    pub fn bundled() -> Self {
        let setosa = Species::Setosa as usize;
        let versicolor = Species::Versicolor as usize;
        let virginica = Species::Virginica as usize;
        Self {
            model_version: MODEL_VERSION,
            model_id: Some("iris_cart_v1".to_string()),
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            classes: Species::ALL.iter().map(|s| s.id().to_string()).collect(),
            classifier: Classifier::DecisionTree(DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 2,
                        threshold: 2.45,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { class: setosa },
                    TreeNode::Split {
                        feature: 3,
                        threshold: 1.75,
                        left: 3,
                        right: 6,
                    },
                    TreeNode::Split {
                        feature: 2,
                        threshold: 4.95,
                        left: 4,
                        right: 5,
                    },
                    TreeNode::Leaf { class: versicolor },
                    TreeNode::Leaf { class: virginica },
                    TreeNode::Leaf { class: virginica },
                ],
            }),
        }
    }

    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.model_version != MODEL_VERSION {
            return Err(ModelError::Invalid(format!(
                "Unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            )));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(actual, expected)| actual != expected)
        {
            return Err(ModelError::Invalid(format!(
                "feature_names must be {FEATURE_NAMES:?}, got {:?}",
                self.feature_names
            )));
        }
        if self.classes.len() != Species::ALL.len() {
            return Err(ModelError::Invalid(format!(
                "Model must contain exactly {} classes, got {}",
                Species::ALL.len(),
                self.classes.len()
            )));
        }
        let n_classes = self.classes.len();
        match &self.classifier {
            Classifier::DecisionTree(tree) => tree.validate(n_classes),
            Classifier::LogisticRegression(logreg) => logreg.validate(n_classes),
        }
        .map_err(ModelError::Invalid)
    }

    /// Parse and validate a model from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the model as pretty JSON, creating parent directories as needed.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let text = self.to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ModelError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Predict the class index for a feature vector in column order.
    pub fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<usize, ModelError> {
        match &self.classifier {
            Classifier::DecisionTree(tree) => tree
                .predict_class_index(features)
                .ok_or_else(|| ModelError::Inference("decision tree walk failed".to_string())),
            Classifier::LogisticRegression(logreg) => Ok(logreg.predict_class_index(features)),
        }
    }

    pub fn predict_features(&self, features: &IrisFeatures) -> Result<usize, ModelError> {
        self.predict(&features.to_vector())
    }

    /// Class probabilities; decision trees report a one-hot vector.
    pub fn predict_proba(&self, features: &[f32; FEATURE_COUNT]) -> Result<Vec<f32>, ModelError> {
        match &self.classifier {
            Classifier::LogisticRegression(logreg) => Ok(logreg.predict_proba(features)),
            Classifier::DecisionTree(_) => {
                let class = self.predict(features)?;
                let mut proba = vec![0.0; self.classes.len()];
                if let Some(slot) = proba.get_mut(class) {
                    *slot = 1.0;
                }
                Ok(proba)
            }
        }
    }
}
