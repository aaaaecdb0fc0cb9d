use serde::{Deserialize, Serialize};

use super::{argmax, softmax};
use crate::iris::FEATURE_COUNT;

/// Multinomial logistic regression over the four raw measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Row-major `[n_classes][FEATURE_COUNT]`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LogisticRegression {
    pub fn validate(&self, n_classes: usize) -> Result<(), String> {
        if self.weights.len() != n_classes * FEATURE_COUNT {
            return Err(format!(
                "weights length {} does not match {n_classes} classes x {FEATURE_COUNT} features",
                self.weights.len()
            ));
        }
        if self.bias.len() != n_classes {
            return Err("bias length mismatch".to_string());
        }
        if self.weights.iter().chain(&self.bias).any(|v| !v.is_finite()) {
            return Err("weights and bias must be finite".to_string());
        }
        Ok(())
    }

    /// Compute class probabilities for a feature vector.
    pub fn predict_proba(&self, features: &[f32; FEATURE_COUNT]) -> Vec<f32> {
        let logits: Vec<f32> = self
            .bias
            .iter()
            .zip(self.weights.chunks_exact(FEATURE_COUNT))
            .map(|(bias, row)| {
                bias + row
                    .iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
            })
            .collect();
        softmax(&logits)
    }

    pub fn predict_class_index(&self, features: &[f32; FEATURE_COUNT]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn petal_length_model() -> LogisticRegression {
        // Class 0 wins for short petals, class 1 for long ones.
        LogisticRegression {
            weights: vec![0.0, 0.0, -2.0, 0.0, 0.0, 0.0, 2.0, 0.0],
            bias: vec![5.0, -5.0],
        }
    }

    #[test]
    fn predicts_by_weighted_logits() {
        let model = petal_length_model();
        assert_eq!(model.predict_class_index(&[5.0, 3.0, 1.4, 0.2]), 0);
        assert_eq!(model.predict_class_index(&[6.5, 3.0, 5.5, 2.0]), 1);
        let proba = model.predict_proba(&[5.0, 3.0, 1.4, 0.2]);
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn validate_checks_shapes() {
        assert!(petal_length_model().validate(2).is_ok());
        assert!(petal_length_model().validate(3).is_err());
        let mut model = petal_length_model();
        model.bias.pop();
        assert_eq!(model.validate(2).unwrap_err(), "bias length mismatch");
    }
}
