use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use minisearch::{Config, IndexJob};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(Path::new(&path)),
        None => Ok(Config::default()),
    };

    let report = config
        .and_then(IndexJob::new)
        .and_then(|job| job.run());

    match report {
        Ok(report) => {
            info!(
                documents = report.documents,
                entries = report.index_entries,
                "Successfully created final index at '{}'",
                report.index_path.display()
            );
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to render run report: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Index build failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
