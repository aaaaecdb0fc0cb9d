//! Writes the bundled iris decision tree to disk for the prediction service.

use std::path::PathBuf;

use irisview::config;
use irisview::ml::IrisModel;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let out = match options.out {
        Some(path) => path,
        None => config::default_model_path().map_err(|err| err.to_string())?,
    };
    if out.exists() && !options.force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            out.display()
        ));
    }
    let model = IrisModel::bundled();
    model.save_json(&out).map_err(|err| err.to_string())?;
    println!(
        "Wrote {} ({}) to {}",
        model.model_id.as_deref().unwrap_or("model"),
        model.classifier.kind(),
        out.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CliOptions {
    out: Option<PathBuf>,
    force: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--force" => options.force = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "irisview-model-export",
        "",
        "Writes the bundled iris classifier as JSON. Defaults to",
        "<config dir>/.irisview/models/iris_model.json.",
        "",
        "Usage:",
        "  irisview-model-export [--out <iris_model.json>] [--force]",
    ]
    .join("\n")
}
