#![allow(dead_code)]

pub mod irisview_env;

use irisview::iris::SampleRanges;
use irisview::ml::IrisModel;
use irisview::server::{PredictionServer, ServerHandle, ServiceState};

/// Start a two-worker service on a free local port.
pub fn spawn_server(model: Option<IrisModel>) -> ServerHandle {
    let state = ServiceState::new(model, SampleRanges::default());
    PredictionServer::bind("127.0.0.1:0", state, 2)
        .expect("bind test server")
        .spawn()
        .expect("spawn test server")
}

/// Base URL of a port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}
