//! Library exports for the iris prediction service, its dashboard and tooling.
/// Application directory resolution.
pub mod app_dirs;
/// Blocking client for the prediction service.
pub mod client;
/// Persistent TOML configuration.
pub mod config;
/// Native egui dashboard.
pub mod dashboard;
pub(crate) mod http_client;
/// Iris feature vectors, species labels and random samples.
pub mod iris;
/// Tracing setup shared by every binary.
pub mod logging;
/// Serialized classifiers and inference.
pub mod ml;
/// HTTP prediction service.
pub mod server;
/// Request and response bodies exchanged over HTTP.
pub mod wire;
