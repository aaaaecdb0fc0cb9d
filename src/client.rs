//! Blocking client for the prediction service.

use serde::de::DeserializeOwned;
use url::Url;

use crate::http_client;
use crate::iris::IrisFeatures;
use crate::wire::{
    HEALTH_PATH, HealthResponse, INPUT_FIELD, PREDICT_PATH, PredictResponse, RANDOM_SAMPLE_PATH,
    SampleResponse,
};

const MAX_RESPONSE_BYTES: usize = 64 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// Errors returned by backend calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Server returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(String),
}

impl ClientError {
    /// HTTP status code when the backend answered with a non-2xx response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Outcome of pinging the service root.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendHealth {
    /// Service answered 200.
    Online { model_loaded: bool },
    /// Service answered with another status code.
    Unhealthy { status: u16 },
    /// Service could not be reached.
    Offline { reason: String },
}

impl BackendHealth {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

/// Random sample as returned by the service, kept both raw (for preview) and typed.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePayload {
    pub raw: serde_json::Value,
    pub features: IrisFeatures,
}

/// Thin wrapper over the shared agent bound to one service base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let mut base = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base),
                reason: err.to_string(),
            })
    }

    /// Ping `GET /`; any status other than 200 counts as unhealthy.
    pub fn check_health(&self) -> BackendHealth {
        let url = match self.endpoint(HEALTH_PATH) {
            Ok(url) => url,
            Err(err) => {
                return BackendHealth::Offline {
                    reason: err.to_string(),
                };
            }
        };
        match http_client::agent().get(url.as_str()).call() {
            Ok(response) if response.status() == 200 => {
                let model_loaded = read_json::<HealthResponse>(response)
                    .map(|health| health.model_loaded)
                    .unwrap_or(true);
                BackendHealth::Online { model_loaded }
            }
            Ok(response) => BackendHealth::Unhealthy {
                status: response.status(),
            },
            Err(ureq::Error::Status(status, _)) => BackendHealth::Unhealthy { status },
            Err(ureq::Error::Transport(err)) => BackendHealth::Offline {
                reason: err.to_string(),
            },
        }
    }

    /// Fetch a synthesized feature vector from `GET /random_sample`.
    pub fn random_sample(&self) -> Result<SamplePayload, ClientError> {
        let url = self.endpoint(RANDOM_SAMPLE_PATH)?;
        let response = map_call(http_client::agent().get(url.as_str()).call())?;
        let raw: serde_json::Value = read_json(response)?;
        let typed: SampleResponse = serde_json::from_value(raw.clone())
            .map_err(|err| ClientError::Json(format!("{err}: {raw}")))?;
        Ok(SamplePayload {
            raw,
            features: typed.input_test,
        })
    }

    /// Post an arbitrary `input_test` object and return the class label.
    ///
    /// The service is responsible for validating the payload.
    pub fn predict_value(&self, input: &serde_json::Value) -> Result<i64, ClientError> {
        let url = self.endpoint(PREDICT_PATH)?;
        let request = http_client::agent()
            .post(url.as_str())
            .set("Accept", "application/json");
        let response = map_call(request.send_json(input))?;
        let body: PredictResponse = read_json(response)?;
        Ok(body.response)
    }

    pub fn predict(&self, features: &IrisFeatures) -> Result<i64, ClientError> {
        let value =
            serde_json::to_value(features).map_err(|err| ClientError::Json(err.to_string()))?;
        self.predict_value(&value)
    }
}

/// Pull the `input_test` object out of an uploaded or fetched payload.
pub fn extract_input(payload: &serde_json::Value) -> Option<&serde_json::Value> {
    payload.get(INPUT_FIELD).filter(|value| value.is_object())
}

fn map_call(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, ClientError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(code, response)) => Err(ClientError::Status {
            code,
            body: http_client::read_body_lossy(response, MAX_ERROR_BODY_BYTES),
        }),
        Err(ureq::Error::Transport(err)) => Err(ClientError::Transport(err.to_string())),
    }
}

fn read_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ClientError> {
    let bytes = http_client::read_response_bytes(response, MAX_RESPONSE_BYTES)
        .map_err(|err| ClientError::Json(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| {
        ClientError::Json(format!("{err}: {}", String::from_utf8_lossy(&bytes).trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::tests::serve_once;
    use serde_json::json;

    fn json_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            BackendClient::new("ftp://localhost"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(BackendClient::new("not a url").is_err());
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let client = BackendClient::new("http://host:8000/iris").unwrap();
        assert_eq!(client.base_url(), "http://host:8000/iris/");
        assert_eq!(
            client.endpoint(PREDICT_PATH).unwrap().as_str(),
            "http://host:8000/iris/predict"
        );
        assert_eq!(
            client.endpoint(HEALTH_PATH).unwrap().as_str(),
            "http://host:8000/iris/"
        );
    }

    #[test]
    fn health_reads_model_flag() {
        let url = serve_once(json_response(
            "200 OK",
            r#"{"status":"healthy","model_loaded":false}"#,
        ));
        let client = BackendClient::new(&url).unwrap();
        assert_eq!(
            client.check_health(),
            BackendHealth::Online {
                model_loaded: false
            }
        );
    }

    #[test]
    fn health_reports_unhealthy_status() {
        let url = serve_once(json_response("503 Service Unavailable", r#"{"detail":"busy"}"#));
        let client = BackendClient::new(&url).unwrap();
        assert_eq!(
            client.check_health(),
            BackendHealth::Unhealthy { status: 503 }
        );
    }

    #[test]
    fn health_reports_offline_when_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = BackendClient::new(&format!("http://{addr}")).unwrap();
        assert!(matches!(
            client.check_health(),
            BackendHealth::Offline { .. }
        ));
    }

    #[test]
    fn predict_returns_label() {
        let url = serve_once(json_response("200 OK", r#"{"response": 2}"#));
        let client = BackendClient::new(&url).unwrap();
        let label = client
            .predict(&IrisFeatures::from_vector([6.5, 3.0, 5.5, 2.0]))
            .unwrap();
        assert_eq!(label, 2);
    }

    #[test]
    fn predict_surfaces_status_and_body() {
        let url = serve_once(json_response(
            "422 Unprocessable Entity",
            r#"{"detail":"missing field `petal_width`"}"#,
        ));
        let client = BackendClient::new(&url).unwrap();
        let err = client.predict_value(&json!({"sepal_length": 1.0})).unwrap_err();
        assert_eq!(err.status_code(), Some(422));
        assert!(err.to_string().contains("petal_width"));
    }

    #[test]
    fn random_sample_keeps_raw_and_typed_views() {
        let body = r#"{"input_test":{"sepal_length":5.1,"sepal_width":3.5,"petal_length":1.4,"petal_width":0.2}}"#;
        let url = serve_once(json_response("200 OK", body));
        let client = BackendClient::new(&url).unwrap();
        let sample = client.random_sample().unwrap();
        assert_eq!(sample.features.to_vector(), [5.1, 3.5, 1.4, 0.2]);
        assert!(extract_input(&sample.raw).is_some());
    }

    #[test]
    fn malformed_json_is_reported() {
        let url = serve_once(json_response("200 OK", "not json"));
        let client = BackendClient::new(&url).unwrap();
        assert!(matches!(client.random_sample(), Err(ClientError::Json(_))));
    }

    #[test]
    fn extract_input_requires_object() {
        assert!(extract_input(&json!({"input_test": {"a": 1}})).is_some());
        assert!(extract_input(&json!({"input_test": 3})).is_none());
        assert!(extract_input(&json!({"other": {}})).is_none());
    }
}
