use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use crate::core::error::{Error, IoResultExt, Result};
use crate::core::types::{DocId, PartitionId, WorkerId};
use crate::storage::layout::WorkspaceLayout;
use crate::storage::record::encode_posting;

/// One mapper's output handles, opened lazily per partition.
///
/// Handles are flushed and closed by `finish`, or on drop if the mapper bails
/// out early, so no partial record is left buffered.
pub struct PartitionWriters<'a> {
    layout: &'a WorkspaceLayout,
    worker: WorkerId,
    writers: BTreeMap<PartitionId, BufWriter<File>>,
}

impl<'a> PartitionWriters<'a> {
    pub fn new(layout: &'a WorkspaceLayout, worker: WorkerId) -> Self {
        PartitionWriters {
            layout,
            worker,
            writers: BTreeMap::new(),
        }
    }

    pub fn write(&mut self, partition: PartitionId, term: &str, doc_id: &DocId) -> Result<()> {
        let layout = self.layout;
        let worker = self.worker;

        let writer = match self.writers.entry(partition) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = layout.intermediate_path(worker, partition);
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .at_path(&path)?;
                entry.insert(BufWriter::new(file))
            }
        };

        writer.write_all(encode_posting(term, doc_id).as_bytes())
            .map_err(|e| Error::io(format!(
                "{}: {}",
                layout.intermediate_path(worker, partition).display(),
                e
            )))
    }

    pub fn partitions(&self) -> usize {
        self.writers.len()
    }

    /// Flush and close every handle, reporting the first failure
    pub fn finish(mut self) -> Result<usize> {
        let writers = std::mem::take(&mut self.writers);
        let count = writers.len();
        let mut first_error = None;

        for (partition, mut writer) in writers {
            let path = self.layout.intermediate_path(self.worker, partition);
            if let Err(err) = writer.flush().at_path(&path) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }
}

impl Drop for PartitionWriters<'_> {
    fn drop(&mut self) {
        for writer in self.writers.values_mut() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::fs;

    #[test]
    fn only_touched_partitions_get_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("data"),
            workspace_dir: dir.path().join("temp"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        };
        let layout = WorkspaceLayout::new(&config);
        layout.reset().unwrap();

        let doc = DocId::new("doc1.txt");
        let mut writers = PartitionWriters::new(&layout, WorkerId(0));
        writers.write(PartitionId(2), "cat", &doc).unwrap();
        writers.write(PartitionId(2), "cat", &doc).unwrap();
        writers.write(PartitionId(0), "sat", &doc).unwrap();
        assert_eq!(writers.finish().unwrap(), 2);

        let p2 = fs::read_to_string(layout.intermediate_path(WorkerId(0), PartitionId(2))).unwrap();
        assert_eq!(p2, "cat\tdoc1.txt\ncat\tdoc1.txt\n");
        assert!(!layout.intermediate_path(WorkerId(0), PartitionId(1)).exists());
    }

    #[test]
    fn dropped_writers_still_flush() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("data"),
            workspace_dir: dir.path().join("temp"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        };
        let layout = WorkspaceLayout::new(&config);
        layout.reset().unwrap();

        {
            let mut writers = PartitionWriters::new(&layout, WorkerId(5));
            writers.write(PartitionId(1), "dog", &DocId::new("doc2.txt")).unwrap();
        }

        let data = fs::read_to_string(layout.intermediate_path(WorkerId(5), PartitionId(1))).unwrap();
        assert_eq!(data, "dog\tdoc2.txt\n");
    }
}
