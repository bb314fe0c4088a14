use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::MapStats;
use crate::core::types::{DocId, Document, WorkerId};
use crate::mapreduce::partitioner::partition;
use crate::storage::layout::WorkspaceLayout;
use crate::storage::partition_writer::PartitionWriters;
use crate::storage::record::is_record_safe;

/// Map task: one document in, `(term, doc)` records out, one file per
/// partition touched. Writes only files keyed by its own worker id.
pub struct Mapper<'a> {
    pub worker: WorkerId,
    pub num_reducers: usize,
    pub analyzer: &'a Analyzer,
    pub layout: &'a WorkspaceLayout,
}

impl<'a> Mapper<'a> {
    pub fn new(
        worker: WorkerId,
        num_reducers: usize,
        analyzer: &'a Analyzer,
        layout: &'a WorkspaceLayout,
    ) -> Self {
        Mapper {
            worker,
            num_reducers,
            analyzer,
            layout,
        }
    }

    pub fn run(&self, doc: &Document) -> Result<MapStats> {
        let text = doc.load()?;
        self.map_text(&doc.id, &text)
    }

    /// Emit one record per term occurrence
    pub fn map_text(&self, doc_id: &DocId, text: &str) -> Result<MapStats> {
        if !is_record_safe(doc_id.as_str()) {
            return Err(Error::new(
                ErrorKind::Format,
                format!("document id {:?} contains a tab or line break", doc_id.as_str()),
            ));
        }

        let mut writers = PartitionWriters::new(self.layout, self.worker);
        let mut postings = 0u64;

        for term in self.analyzer.terms(text) {
            if !is_record_safe(&term) {
                return Err(Error::new(
                    ErrorKind::Format,
                    format!("{}: analyzer produced term {:?} containing a tab or line break", doc_id, term),
                ));
            }

            writers.write(partition(&term, self.num_reducers), &term, doc_id)?;
            postings += 1;
        }

        let partitions_touched = writers.finish()?;

        debug!(
            worker = self.worker.0,
            doc = %doc_id,
            postings,
            partitions_touched,
            "Mapped document"
        );

        Ok(MapStats {
            postings,
            partitions_touched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::core::config::Config;
    use crate::core::types::PartitionId;

    fn layout_in(dir: &std::path::Path) -> WorkspaceLayout {
        let config = Config {
            input_dir: dir.join("data"),
            workspace_dir: dir.join("temp"),
            output_dir: dir.join("output"),
            ..Config::default()
        };
        let layout = WorkspaceLayout::new(&config);
        layout.reset().unwrap();
        layout
    }

    #[test]
    fn every_occurrence_is_routed_to_its_partition() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let analyzer = Analyzer::standard_english();
        let mapper = Mapper::new(WorkerId(3), 4, &analyzer, &layout);

        let stats = mapper.map_text(&DocId::new("doc1.txt"), "the cat sat on the cat").unwrap();
        assert_eq!(stats.postings, 3);

        let mut records = Vec::new();
        for p in 0..4 {
            let path = layout.intermediate_path(WorkerId(3), PartitionId(p));
            if let Ok(data) = fs::read_to_string(&path) {
                for line in data.lines() {
                    let term = line.split('\t').next().unwrap();
                    assert_eq!(partition(term, 4), PartitionId(p));
                    records.push(line.to_string());
                }
            }
        }
        records.sort();
        assert_eq!(records, vec!["cat\tdoc1.txt", "cat\tdoc1.txt", "sat\tdoc1.txt"]);

        let expected: std::collections::BTreeSet<_> = ["cat", "sat"].iter().map(|t| partition(t, 4)).collect();
        assert_eq!(stats.partitions_touched, expected.len());
    }

    #[test]
    fn document_without_terms_creates_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let analyzer = Analyzer::standard_english();
        let mapper = Mapper::new(WorkerId(0), 2, &analyzer, &layout);

        let stats = mapper.map_text(&DocId::new("empty.txt"), "the and of 123").unwrap();
        assert_eq!(stats.postings, 0);
        assert_eq!(fs::read_dir(&layout.workspace_dir).unwrap().count(), 0);
    }

    #[test]
    fn unsafe_document_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let analyzer = Analyzer::simple();
        let mapper = Mapper::new(WorkerId(0), 2, &analyzer, &layout);

        let err = mapper.map_text(&DocId::new("bad\tname.txt"), "cat").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
    }
}
