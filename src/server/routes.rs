//! Request routing for the prediction service, independent of the socket layer.

use serde::Serialize;
use tiny_http::Method;

use super::ServiceState;
use crate::iris::{IrisFeatures, random_sample};
use crate::wire::{
    ErrorResponse, HEALTH_PATH, HealthResponse, PREDICT_PATH, PredictResponse,
    RANDOM_SAMPLE_PATH, SampleResponse,
};

/// Status code and JSON body produced by a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json(status: u16, body: &impl Serialize) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status, body },
            Err(err) => {
                tracing::error!("Failed to serialize response body: {err}");
                Self {
                    status: 500,
                    body: r#"{"detail":"Internal Server Error"}"#.to_string(),
                }
            }
        }
    }

    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorResponse {
                detail: detail.into(),
            },
        )
    }
}

/// Dispatch one request. Query strings are ignored.
pub fn handle(state: &ServiceState, method: &Method, url: &str, body: &[u8]) -> ApiResponse {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match (path, method) {
        (HEALTH_PATH, Method::Get) => health(state),
        (PREDICT_PATH, Method::Post) => predict(state, body),
        (RANDOM_SAMPLE_PATH, Method::Get) => sample(state),
        (HEALTH_PATH | PREDICT_PATH | RANDOM_SAMPLE_PATH, _) => {
            ApiResponse::error(405, "Method Not Allowed")
        }
        _ => ApiResponse::error(404, "Not Found"),
    }
}

fn health(state: &ServiceState) -> ApiResponse {
    ApiResponse::json(200, &HealthResponse::healthy(state.model().is_some()))
}

fn predict(state: &ServiceState, body: &[u8]) -> ApiResponse {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => return ApiResponse::error(422, format!("Invalid iris features: {err}")),
    };
    if !value.is_object() {
        return ApiResponse::error(422, "Invalid iris features: expected a JSON object");
    }
    let features: IrisFeatures = match serde_json::from_value(value) {
        Ok(features) => features,
        Err(err) => return ApiResponse::error(422, format!("Invalid iris features: {err}")),
    };
    if let Err(err) = features.validate() {
        return ApiResponse::error(422, err.to_string());
    }
    let Some(model) = state.model() else {
        return ApiResponse::error(500, format!("Model not loaded: {}", state.model_status()));
    };
    match model.predict_features(&features) {
        Ok(class) => ApiResponse::json(
            200,
            &PredictResponse {
                response: class as i64,
            },
        ),
        Err(err) => {
            tracing::error!("Prediction failed for {features:?}: {err}");
            ApiResponse::error(500, err.to_string())
        }
    }
}

fn sample(state: &ServiceState) -> ApiResponse {
    let input_test = random_sample(state.sample_ranges(), &mut rand::rng());
    ApiResponse::json(200, &SampleResponse { input_test })
}
