//! Prediction service: serves `/`, `/predict` and `/random_sample` over HTTP.

use std::path::PathBuf;

use irisview::config;
use irisview::logging;
use irisview::ml::IrisModel;
use irisview::server::{PredictionServer, ServiceState};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("irisview-server") {
        eprintln!("Logging disabled: {err}");
    }

    let cfg = config::load_or_default().map_err(|err| err.to_string())?;
    let mut settings = cfg.server;
    if let Some(bind) = options.bind_address {
        settings.bind_address = bind;
    }
    if let Some(port) = options.port {
        settings.port = port;
    }
    if let Some(workers) = options.workers {
        settings.worker_threads = workers;
    }

    let state = if options.bundled_model {
        tracing::info!("Serving the bundled decision tree");
        ServiceState::new(Some(IrisModel::bundled()), settings.sample_ranges)
    } else {
        let model_path = match options.model_path.or(settings.model_path.clone()) {
            Some(path) => path,
            None => config::default_model_path().map_err(|err| err.to_string())?,
        };
        ServiceState::load(&model_path, settings.sample_ranges)
    };

    let addr = settings.socket_address();
    let server = PredictionServer::bind(&addr, state, settings.worker_threads)
        .map_err(|err| err.to_string())?;
    server.run().map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CliOptions {
    bind_address: Option<String>,
    port: Option<u16>,
    model_path: Option<PathBuf>,
    workers: Option<usize>,
    bundled_model: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--bind" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bind requires a value".to_string())?;
                options.bind_address = Some(value.to_string());
            }
            "--port" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--port requires a value".to_string())?;
                let port = value
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid --port value: {value}"))?;
                options.port = Some(port);
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                options.model_path = Some(PathBuf::from(value));
            }
            "--workers" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--workers requires a value".to_string())?;
                let workers = value
                    .parse::<usize>()
                    .ok()
                    .filter(|workers| *workers > 0)
                    .ok_or_else(|| format!("Invalid --workers value: {value}"))?;
                options.workers = Some(config::clamp_worker_threads(workers));
            }
            "--bundled-model" => options.bundled_model = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    if options.bundled_model && options.model_path.is_some() {
        return Err("--bundled-model cannot be combined with --model".to_string());
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "irisview-server",
        "",
        "Serves iris predictions over HTTP. Settings come from config.toml and",
        "IRISVIEW_MODEL_PATH; flags override both.",
        "",
        "Usage:",
        "  irisview-server [--bind <addr>] [--port <port>] [--workers <1-64>]",
        "                  [--model <iris_model.json> | --bundled-model]",
    ]
    .join("\n")
}
