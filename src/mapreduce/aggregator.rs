use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::debug;
use crate::core::error::{IoResultExt, Result};
use crate::storage::layout::WorkspaceLayout;

/// Concatenate every `part-r-*` file, in ascending partition order, into the
/// final index. Returns the number of bytes written.
///
/// Nothing is re-sorted across partitions: the index is partition-major and
/// only term-sorted within each partition's block. With one reducer that is a
/// global term order; with several it is not.
pub fn aggregate(layout: &WorkspaceLayout) -> Result<u64> {
    let parts = layout.partition_outputs()?;
    let target = &layout.index_path;
    let mut out = BufWriter::new(File::create(target).at_path(target)?);
    let mut total = 0;

    for (partition, path) in &parts {
        let mut input = File::open(path).at_path(path)?;
        let copied = io::copy(&mut input, &mut out).at_path(target)?;
        debug!(partition = partition.0, bytes = copied, "Appended partition output");
        total += copied;
    }

    out.flush().at_path(target)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::core::config::Config;
    use crate::core::types::PartitionId;

    #[test]
    fn concatenates_in_numeric_partition_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("data"),
            workspace_dir: dir.path().join("temp"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        };
        let layout = WorkspaceLayout::new(&config);
        layout.reset().unwrap();

        fs::write(layout.partition_output_path(PartitionId(10)), "b\t[\"d.txt\"]\n").unwrap();
        fs::write(layout.partition_output_path(PartitionId(2)), "z\t[\"d.txt\"]\n").unwrap();
        fs::write(layout.partition_output_path(PartitionId(0)), "m\t[\"d.txt\"]\n").unwrap();

        let bytes = aggregate(&layout).unwrap();
        let index = fs::read_to_string(&layout.index_path).unwrap();
        assert_eq!(index, "m\t[\"d.txt\"]\nz\t[\"d.txt\"]\nb\t[\"d.txt\"]\n");
        assert_eq!(bytes, index.len() as u64);
    }

    #[test]
    fn no_partitions_gives_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("data"),
            workspace_dir: dir.path().join("temp"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        };
        let layout = WorkspaceLayout::new(&config);
        layout.reset().unwrap();

        assert_eq!(aggregate(&layout).unwrap(), 0);
        assert_eq!(fs::read(&layout.index_path).unwrap(), Vec::<u8>::new());
    }
}
