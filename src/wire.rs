//! JSON bodies exchanged between the dashboard and the prediction service.

use serde::{Deserialize, Serialize};

use crate::iris::IrisFeatures;

pub const HEALTH_PATH: &str = "/";
pub const PREDICT_PATH: &str = "/predict";
pub const RANDOM_SAMPLE_PATH: &str = "/random_sample";

/// Field holding the feature object in sample payloads and uploaded files.
pub const INPUT_FIELD: &str = "input_test";

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Older services omit this field; they always load a model.
    #[serde(default = "default_model_loaded")]
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn healthy(model_loaded: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            model_loaded,
        }
    }
}

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Integer class label.
    pub response: i64,
}

/// Body of `GET /random_sample`; uploaded files use the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleResponse {
    pub input_test: IrisFeatures,
}

/// Error body for any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

fn default_model_loaded() -> bool {
    true
}
