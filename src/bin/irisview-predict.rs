//! Command-line client: classify a JSON file or a random sample through a running service.

use std::path::PathBuf;

use irisview::client::{BackendClient, ClientError, extract_input};
use irisview::config;
use irisview::iris::species_label;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let backend = match options.backend {
        Some(url) => url,
        None => {
            config::load_or_default()
                .map_err(|err| err.to_string())?
                .dashboard
                .backend_url
        }
    };
    let client = BackendClient::new(&backend).map_err(|err| err.to_string())?;

    let input = match options.input {
        Input::File(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&text)
                .map_err(|err| format!("{} is not valid JSON: {err}", path.display()))?;
            extract_input(&payload)
                .cloned()
                .ok_or_else(|| format!("{} has no input_test object", path.display()))?
        }
        Input::Sample => {
            let sample = client
                .random_sample()
                .map_err(|err| request_failed(&backend, "random_sample", &err))?;
            let features = extract_input(&sample.raw)
                .cloned()
                .unwrap_or_else(|| sample.raw.clone());
            println!(
                "Random sample: {}",
                serde_json::to_string(&features).map_err(|err| err.to_string())?
            );
            features
        }
    };

    let label = client
        .predict_value(&input)
        .map_err(|err| request_failed(&backend, "predict", &err))?;
    println!("{label}\t{}", species_label(label));
    Ok(())
}

/// The dashboard's messages hide transport details; the CLI prints them.
fn request_failed(backend: &str, call: &str, err: &ClientError) -> String {
    let hint = match err {
        ClientError::Transport(_) => "\nIs irisview-server running at that address?",
        _ => "",
    };
    format!("{call} request to {backend} failed: {err}{hint}")
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    File(PathBuf),
    Sample,
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    backend: Option<String>,
    input: Input,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut backend = None;
    let mut input = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--backend" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--backend requires a value".to_string())?;
                backend = Some(value.to_string());
            }
            "--file" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--file requires a value".to_string())?;
                if input.replace(Input::File(PathBuf::from(value))).is_some() {
                    return Err("Use either --file or --sample, not both".to_string());
                }
            }
            "--sample" => {
                if input.replace(Input::Sample).is_some() {
                    return Err("Use either --file or --sample, not both".to_string());
                }
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    let input = input.ok_or_else(help_text)?;
    Ok(CliOptions { backend, input })
}

fn help_text() -> String {
    [
        "irisview-predict",
        "",
        "Sends an input_test object to the prediction service and prints the label.",
        "",
        "Usage:",
        "  irisview-predict (--file <input.json> | --sample) [--backend <url>]",
    ]
    .join("\n")
}
