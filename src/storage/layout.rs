use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use regex::Regex;
use tracing::debug;
use crate::core::config::Config;
use crate::core::error::{IoResultExt, Result};
use crate::core::types::{PartitionId, WorkerId};

static INTERMEDIATE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^temp_mapper_(\d+)_part_(\d+)\.out$").expect("valid intermediate file pattern")
});

static PARTITION_OUTPUT_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^part-r-(\d{5,})$").expect("valid partition output pattern")
});

/// Directory structure of a run.
///
/// ```text
/// workspace/
///   temp_mapper_{w}_part_{p}.out     map output, one per (worker, partition)
///   reducer_{p}_input.txt            shuffled partition
///   reducer_{p}_sorted_input.txt     sorted partition, reducer input
///   reducer_{p}_run_{k}.txt          external sort spill runs (transient)
/// output/
///   part-r-{p:05}                    reducer output
///   inverted_index.txt               final index
/// ```
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub workspace_dir: PathBuf,
    pub output_dir: PathBuf,
    pub index_path: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(config: &Config) -> Self {
        WorkspaceLayout {
            workspace_dir: config.workspace_dir.clone(),
            output_dir: config.output_dir.clone(),
            index_path: config.index_path(),
        }
    }

    /// Destroy any previous run's artifacts and recreate both directories
    pub fn reset(&self) -> Result<()> {
        for dir in [&self.workspace_dir, &self.output_dir] {
            if dir.exists() {
                debug!(dir = %dir.display(), "Removing previous run directory");
                fs::remove_dir_all(dir).at_path(dir)?;
            }
            fs::create_dir_all(dir).at_path(dir)?;
        }
        Ok(())
    }

    pub fn intermediate_path(&self, worker: WorkerId, partition: PartitionId) -> PathBuf {
        self.workspace_dir.join(format!("temp_mapper_{}_part_{}.out", worker.0, partition.0))
    }

    pub fn shuffled_path(&self, partition: PartitionId) -> PathBuf {
        self.workspace_dir.join(format!("reducer_{}_input.txt", partition.0))
    }

    pub fn sorted_path(&self, partition: PartitionId) -> PathBuf {
        self.workspace_dir.join(format!("reducer_{}_sorted_input.txt", partition.0))
    }

    pub fn sort_run_path(&self, partition: PartitionId, run: usize) -> PathBuf {
        self.workspace_dir.join(format!("reducer_{}_run_{}.txt", partition.0, run))
    }

    pub fn partition_output_path(&self, partition: PartitionId) -> PathBuf {
        self.output_dir.join(format!("part-r-{:05}", partition.0))
    }

    /// Every mapper's file for `partition`, ordered by worker id
    pub fn intermediate_files(&self, partition: PartitionId) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        for entry in fs::read_dir(&self.workspace_dir).at_path(&self.workspace_dir)? {
            let entry = entry.at_path(&self.workspace_dir)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some((worker, part)) = parse_intermediate_name(name) {
                if part == partition {
                    found.push((worker, entry.path()));
                }
            }
        }

        found.sort_by_key(|(worker, _)| *worker);
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Reducer outputs actually produced, in ascending partition order
    pub fn partition_outputs(&self) -> Result<Vec<(PartitionId, PathBuf)>> {
        let mut found = Vec::new();

        for entry in fs::read_dir(&self.output_dir).at_path(&self.output_dir)? {
            let entry = entry.at_path(&self.output_dir)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(partition) = parse_partition_output_name(name) {
                found.push((partition, entry.path()));
            }
        }

        found.sort_by_key(|(partition, _)| *partition);
        Ok(found)
    }
}

pub fn parse_intermediate_name(name: &str) -> Option<(WorkerId, PartitionId)> {
    let caps = INTERMEDIATE_FILE.captures(name)?;
    let worker = caps[1].parse().ok()?;
    let partition = caps[2].parse().ok()?;
    Some((WorkerId(worker), PartitionId(partition)))
}

pub fn parse_partition_output_name(name: &str) -> Option<PartitionId> {
    let caps = PARTITION_OUTPUT_FILE.captures(name)?;
    caps[1].parse().ok().map(PartitionId)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_in(dir: &std::path::Path) -> WorkspaceLayout {
        let config = Config {
            input_dir: dir.join("data"),
            workspace_dir: dir.join("temp"),
            output_dir: dir.join("output"),
            ..Config::default()
        };
        WorkspaceLayout::new(&config)
    }

    #[test]
    fn file_names_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());

        let path = layout.intermediate_path(WorkerId(12), PartitionId(3));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "temp_mapper_12_part_3.out");
        assert_eq!(parse_intermediate_name(name), Some((WorkerId(12), PartitionId(3))));

        let path = layout.partition_output_path(PartitionId(7));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "part-r-00007");
        assert_eq!(parse_partition_output_name(name), Some(PartitionId(7)));
    }

    #[test]
    fn unrelated_names_are_ignored() {
        assert_eq!(parse_intermediate_name("reducer_0_input.txt"), None);
        assert_eq!(parse_intermediate_name("temp_mapper_x_part_1.out"), None);
        assert_eq!(parse_partition_output_name("inverted_index.txt"), None);
        assert_eq!(parse_partition_output_name("part-r-7"), None);
    }

    #[test]
    fn reset_clears_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        layout.reset().unwrap();

        let stale = layout.partition_output_path(PartitionId(0));
        fs::write(&stale, "old\t[\"doc.txt\"]\n").unwrap();
        layout.reset().unwrap();

        assert!(!stale.exists());
        assert!(layout.workspace_dir.is_dir());
        assert!(layout.output_dir.is_dir());
    }

    #[test]
    fn discovery_filters_by_partition_and_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        layout.reset().unwrap();

        for (w, p) in [(10, 1), (2, 1), (2, 0)] {
            fs::write(layout.intermediate_path(WorkerId(w), PartitionId(p)), "a\tb\n").unwrap();
        }
        fs::write(layout.shuffled_path(PartitionId(1)), "").unwrap();

        let files = layout.intermediate_files(PartitionId(1)).unwrap();
        assert_eq!(files, vec![
            layout.intermediate_path(WorkerId(2), PartitionId(1)),
            layout.intermediate_path(WorkerId(10), PartitionId(1)),
        ]);

        for p in [12, 3] {
            fs::write(layout.partition_output_path(PartitionId(p)), "").unwrap();
        }
        fs::write(&layout.index_path, "").unwrap();

        let outputs: Vec<PartitionId> = layout.partition_outputs().unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(outputs, vec![PartitionId(3), PartitionId(12)]);
    }
}
