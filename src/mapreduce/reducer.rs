use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;
use crate::core::error::{Error, IoResultExt, Result};
use crate::core::stats::ReduceStats;
use crate::core::types::{DocId, IndexEntry, PartitionId};
use crate::storage::layout::WorkspaceLayout;
use crate::storage::record::parse_posting;

/// Streaming group state over a sorted `term\tdoc` stream
#[derive(Debug, Default, PartialEq)]
pub enum Accumulator {
    #[default]
    Empty,
    Accumulating {
        term: String,
        docs: BTreeSet<String>,
    },
}

impl Accumulator {
    pub fn current_term(&self) -> Option<&str> {
        match self {
            Accumulator::Empty => None,
            Accumulator::Accumulating { term, .. } => Some(term),
        }
    }

    /// Feed one record; returns the finished entry when the term changes
    pub fn push(&mut self, term: &str, doc: &str) -> Option<IndexEntry> {
        if let Accumulator::Accumulating { term: current, docs } = self {
            if current.as_str() == term {
                docs.insert(doc.to_string());
                return None;
            }
        }

        let next = Accumulator::Accumulating {
            term: term.to_string(),
            docs: BTreeSet::from([doc.to_string()]),
        };
        std::mem::replace(self, next).flush()
    }

    /// End of stream: the pending entry, if any input was seen
    pub fn flush(self) -> Option<IndexEntry> {
        match self {
            Accumulator::Empty => None,
            Accumulator::Accumulating { term, docs } => Some(IndexEntry {
                term,
                docs: docs.into_iter().map(DocId).collect(),
            }),
        }
    }
}

/// Reduce a sorted stream into index lines.
///
/// A line without a tab halts the reduction with a `Format` error naming it,
/// as does a term that sorts before the one being accumulated.
pub fn reduce_stream<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<ReduceStats> {
    let mut state = Accumulator::Empty;
    let mut stats = ReduceStats::default();

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        stats.lines_read += 1;

        let (term, doc) = parse_posting(&line)
            .ok_or_else(|| Error::format(idx + 1, &line, "missing tab separator"))?;

        if let Some(current) = state.current_term() {
            if term < current {
                return Err(Error::format(idx + 1, &line, "input is not sorted"));
            }
        }

        if let Some(entry) = state.push(term, doc) {
            output.write_all(entry.to_line()?.as_bytes())?;
            stats.entries_written += 1;
        }
    }

    if let Some(entry) = state.flush() {
        output.write_all(entry.to_line()?.as_bytes())?;
        stats.entries_written += 1;
    }

    output.flush()?;
    Ok(stats)
}

/// Reduce task for one partition
pub struct Reducer<'a> {
    pub partition: PartitionId,
    pub layout: &'a WorkspaceLayout,
}

impl<'a> Reducer<'a> {
    pub fn new(partition: PartitionId, layout: &'a WorkspaceLayout) -> Self {
        Reducer { partition, layout }
    }

    pub fn run(&self, sorted_input: &Path) -> Result<ReduceStats> {
        let input = BufReader::new(File::open(sorted_input).at_path(sorted_input)?);

        let output_path = self.layout.partition_output_path(self.partition);
        let mut output = BufWriter::new(File::create(&output_path).at_path(&output_path)?);

        let stats = reduce_stream(input, &mut output)
            .map_err(|e| e.with_context(sorted_input.display()))?;

        debug!(
            partition = self.partition.0,
            lines = stats.lines_read,
            entries = stats.entries_written,
            "Reduced partition"
        );

        Ok(stats)
    }
}
