//! Line formats exchanged between phases.
//!
//! Intermediate record (map output, reducer input), one per line:
//!
//! ```text
//! <term>\t<document id>\n
//! ```
//!
//! Index line (reducer output, final index), version 1:
//!
//! ```text
//! <term>\t<document ids as a compact JSON array of strings>\n
//! cat\t["doc1.txt","doc2.txt"]
//! ```
//!
//! Document ids in an index line are unique and in ascending byte order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use crate::core::error::{Error, IoResultExt, Result};
use crate::core::types::{DocId, IndexEntry};

pub const INDEX_FORMAT_VERSION: u32 = 1;

pub const SEPARATOR: char = '\t';

/// Characters that would corrupt a line-oriented record
pub fn is_record_safe(field: &str) -> bool {
    !field.contains(['\t', '\n', '\r'])
}

pub fn encode_posting(term: &str, doc_id: &DocId) -> String {
    format!("{}{}{}\n", term, SEPARATOR, doc_id.as_str())
}

/// Split a record on its first tab; `None` if there is no tab
pub fn parse_posting(line: &str) -> Option<(&str, &str)> {
    line.split_once(SEPARATOR)
}

impl IndexEntry {
    pub fn new(term: impl Into<String>, docs: Vec<DocId>) -> Self {
        IndexEntry {
            term: term.into(),
            docs,
        }
    }

    pub fn to_line(&self) -> Result<String> {
        let ids: Vec<&str> = self.docs.iter().map(DocId::as_str).collect();
        let list = serde_json::to_string(&ids)?;
        Ok(format!("{}{}{}\n", self.term, SEPARATOR, list))
    }

    pub fn parse_line(line_number: usize, line: &str) -> Result<Self> {
        let (term, list) = line.split_once(SEPARATOR)
            .ok_or_else(|| Error::format(line_number, line, "missing tab separator"))?;

        let ids: Vec<String> = serde_json::from_str(list)
            .map_err(|e| Error::format(line_number, line, &format!("bad document list ({})", e)))?;

        Ok(IndexEntry::new(term, ids.into_iter().map(DocId).collect()))
    }
}

/// Load an index file written by the reduce or aggregate step
pub fn read_index(path: &Path) -> Result<Vec<IndexEntry>> {
    let reader = BufReader::new(File::open(path).at_path(path)?);
    let mut entries = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.at_path(path)?;
        let entry = IndexEntry::parse_line(idx + 1, &line)
            .map_err(|e| e.with_context(path.display()))?;
        entries.push(entry);
    }

    Ok(entries)
}
