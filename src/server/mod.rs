//! Prediction service: a small pool of worker threads sharing one HTTP listener.

mod routes;

pub use routes::{ApiResponse, handle};

use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};

use crate::config::clamp_worker_threads;
use crate::iris::SampleRanges;
use crate::ml::IrisModel;

/// Largest request body accepted by the service.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors raised while starting the service.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("Failed to spawn worker thread: {0}")]
    SpawnWorker(std::io::Error),
}

/// Read-only state shared by every worker.
#[derive(Debug)]
pub struct ServiceState {
    model: Option<IrisModel>,
    model_status: String,
    sample_ranges: SampleRanges,
}

impl ServiceState {
    pub fn new(model: Option<IrisModel>, sample_ranges: SampleRanges) -> Self {
        let model_status = match &model {
            Some(model) => format!(
                "{} ({})",
                model.model_id.as_deref().unwrap_or("unnamed"),
                model.classifier.kind()
            ),
            None => "no model".to_string(),
        };
        Self {
            model,
            model_status,
            sample_ranges,
        }
    }

    /// State for a service that failed to load its model; `reason` is reported to callers.
    pub fn without_model(reason: impl Into<String>, sample_ranges: SampleRanges) -> Self {
        Self {
            model: None,
            model_status: reason.into(),
            sample_ranges,
        }
    }

    /// Load the model at `path`, keeping the service usable if that fails.
    pub fn load(path: &Path, sample_ranges: SampleRanges) -> Self {
        match IrisModel::load_json(path) {
            Ok(model) => {
                tracing::info!(
                    "Loaded {} model from {}",
                    model.classifier.kind(),
                    path.display()
                );
                Self::new(Some(model), sample_ranges)
            }
            Err(err) => {
                tracing::warn!("Serving without a model: {err}");
                Self::without_model(err.to_string(), sample_ranges)
            }
        }
    }

    pub fn model(&self) -> Option<&IrisModel> {
        self.model.as_ref()
    }

    /// Loaded model description, or the reason no model is loaded.
    pub fn model_status(&self) -> &str {
        &self.model_status
    }

    pub fn sample_ranges(&self) -> &SampleRanges {
        &self.sample_ranges
    }
}

/// Bound but not yet running service.
pub struct PredictionServer {
    server: Arc<Server>,
    state: Arc<ServiceState>,
    workers: usize,
}

impl PredictionServer {
    /// Bind `addr` (port 0 picks a free port).
    pub fn bind(addr: &str, state: ServiceState, workers: usize) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|err| ServerError::Bind {
            addr: addr.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            server: Arc::new(server),
            state: Arc::new(state),
            workers: clamp_worker_threads(workers),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Start the worker threads and return a handle that stops them on drop.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.local_addr();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handle = ServerHandle {
            server: Arc::clone(&self.server),
            shutdown: Arc::clone(&shutdown),
            workers: Vec::with_capacity(self.workers),
            local_addr,
        };
        for index in 0..self.workers {
            let server = Arc::clone(&self.server);
            let state = Arc::clone(&self.state);
            let shutdown = Arc::clone(&shutdown);
            let worker = thread::Builder::new()
                .name(format!("irisview-http-{index}"))
                .spawn(move || worker_loop(&server, &state, &shutdown))
                .map_err(ServerError::SpawnWorker)?;
            handle.workers.push(worker);
        }
        match local_addr {
            Some(addr) => tracing::info!(
                "Prediction service listening on http://{addr} with {} workers",
                self.workers
            ),
            None => tracing::info!("Prediction service started with {} workers", self.workers),
        }
        Ok(handle)
    }

    /// Serve until the process exits.
    pub fn run(self) -> Result<(), ServerError> {
        let mut handle = self.spawn()?;
        handle.join_workers();
        Ok(())
    }
}

/// Running service; dropping it stops and joins every worker.
pub struct ServerHandle {
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Base URL clients should use to reach the service.
    pub fn base_url(&self) -> Option<String> {
        self.local_addr.map(|addr| format!("http://{addr}"))
    }

    pub fn shutdown(self) {
        drop(self);
    }

    fn join_workers(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Prediction worker panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
        self.join_workers();
        tracing::info!("Prediction service stopped");
    }
}

fn worker_loop(server: &Server, state: &ServiceState, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(RECV_POLL_INTERVAL) {
            Ok(Some(request)) => serve_request(state, request),
            Ok(None) => {}
            Err(err) => {
                if !shutdown.load(Ordering::SeqCst) {
                    tracing::error!("Failed to receive request: {err}");
                }
                break;
            }
        }
    }
}

fn serve_request(state: &ServiceState, mut request: Request) {
    let started = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_string();
    let response = match read_body(&mut request) {
        Ok(body) => handle(state, &method, &url, &body),
        Err(response) => response,
    };
    let status = response.status;
    let mut reply = Response::from_data(response.body.into_bytes()).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        reply = reply.with_header(header);
    }
    if let Err(err) = request.respond(reply) {
        tracing::warn!("Failed to send response for {method} {url}: {err}");
        return;
    }
    tracing::info!(
        "{method} {url} -> {status} in {:.1} ms",
        started.elapsed().as_secs_f64() * 1000.0
    );
}

fn read_body(request: &mut Request) -> Result<Vec<u8>, ApiResponse> {
    if request.body_length().is_some_and(|len| len > MAX_BODY_BYTES) {
        return Err(ApiResponse::error(413, "Request body too large"));
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|err| ApiResponse::error(400, format!("Failed to read request body: {err}")))?;
    if body.len() > MAX_BODY_BYTES {
        return Err(ApiResponse::error(413, "Request body too large"));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_keeps_reason_when_model_missing() {
        let dir = tempdir().unwrap();
        let state = ServiceState::load(&dir.path().join("iris_model.json"), SampleRanges::default());
        assert!(state.model().is_none());
        assert!(state.model_status().contains("iris_model.json"));
    }

    #[test]
    fn load_reads_saved_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iris_model.json");
        IrisModel::bundled().save_json(&path).unwrap();
        let state = ServiceState::load(&path, SampleRanges::default());
        assert!(state.model().is_some());
        assert_eq!(state.model_status(), "iris_cart_v1 (decision_tree)");
    }

    #[test]
    fn bind_reports_bad_address() {
        let err = PredictionServer::bind(
            "definitely-not-a-host:99999",
            ServiceState::new(None, SampleRanges::default()),
            1,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[test]
    fn bind_caps_worker_count() {
        let state = || ServiceState::new(None, SampleRanges::default());
        let server = PredictionServer::bind("127.0.0.1:0", state(), 100_000).unwrap();
        assert_eq!(server.workers, crate::config::MAX_WORKER_THREADS);
        let server = PredictionServer::bind("127.0.0.1:0", state(), 0).unwrap();
        assert_eq!(server.workers, 1);
    }

    #[test]
    fn spawned_server_answers_and_stops() {
        let server = PredictionServer::bind(
            "127.0.0.1:0",
            ServiceState::new(Some(IrisModel::bundled()), SampleRanges::default()),
            2,
        )
        .unwrap();
        let handle = server.spawn().unwrap();
        let url = handle.base_url().unwrap();
        let response = ureq::get(&url).call().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.header("Content-Type"),
            Some("application/json")
        );
        handle.shutdown();
    }
}
