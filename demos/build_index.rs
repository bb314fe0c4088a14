/// Minisearch demo
///
/// Builds an inverted index over a small generated corpus:
/// - writes a few documents to a scratch input directory
/// - runs the map, shuffle/sort, reduce and aggregate phases
/// - prints the run report and the final index

use minisearch::{Config, IndexJob};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let base = std::env::temp_dir().join("minisearch-demo");
    let input_dir = base.join("data");
    fs::create_dir_all(&input_dir)?;

    fs::write(input_dir.join("doc1.txt"), "The cat sat on the mat.")?;
    fs::write(input_dir.join("doc2.txt"), "The dog sat by the door.")?;
    fs::write(input_dir.join("doc3.txt"), "Cats and dogs are running in the garden.")?;

    let config = Config {
        input_dir,
        workspace_dir: base.join("temp"),
        output_dir: base.join("output"),
        num_reducers: 2,
        ..Config::default()
    };

    let job = IndexJob::new(config)?;
    let report = job.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("\n{}", fs::read_to_string(&report.index_path)?);
    Ok(())
}
