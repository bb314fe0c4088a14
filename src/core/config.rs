use std::fs;
use std::env;
use std::path::{Component, Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, IoResultExt, Result};

/// Immutable run configuration handed to the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_dir: PathBuf,          // Documents to index
    pub workspace_dir: PathBuf,      // Intermediate files, reset every run
    pub output_dir: PathBuf,         // part-r-* files and final index, reset every run
    pub num_reducers: usize,         // R
    pub extensions: Vec<String>,     // Eligible document extensions, without the dot
    pub workers: usize,              // Thread pool size for map and reduce tasks
    pub sort_buffer_bytes: usize,    // Above this a partition is sorted in spilled runs
    pub index_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("data"),
            workspace_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("output"),
            num_reducers: 4,
            extensions: vec!["txt".to_string()],
            workers: num_cpus::get(),
            sort_buffer_bytes: 64 * 1024 * 1024,   // 64MB
            index_file_name: "inverted_index.txt".to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).at_path(path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|e| Error::new(
                ErrorKind::InvalidArgument,
                format!("{}: {}", path.display(), e),
            ))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_reducers == 0 {
            return Err(invalid("num_reducers must be at least 1"));
        }
        if self.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }
        if self.sort_buffer_bytes == 0 {
            return Err(invalid("sort_buffer_bytes must be positive"));
        }
        if self.extensions.is_empty() {
            return Err(invalid("at least one document extension is required"));
        }
        if self.index_file_name.is_empty() || self.index_file_name.starts_with("part-r-") {
            return Err(invalid("index_file_name must be non-empty and not look like a partition file"));
        }
        // Workspace and output are wiped at the start of a run, so none of
        // the three directories may contain another
        let dirs = [
            ("input_dir", absolute(&self.input_dir)?),
            ("workspace_dir", absolute(&self.workspace_dir)?),
            ("output_dir", absolute(&self.output_dir)?),
        ];
        for (i, (name, dir)) in dirs.iter().enumerate() {
            for (other_name, other) in &dirs[i + 1..] {
                if dir.starts_with(other) || other.starts_with(dir) {
                    return Err(invalid(&format!(
                        "{} ({}) and {} ({}) must not overlap",
                        name, dir.display(), other_name, other.display(),
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(&self.index_file_name)
    }
}

/// Lexically resolve `path` against the current directory, folding `.` and `..`
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().at_path(path)?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

fn invalid(message: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument, message.to_string())
}
