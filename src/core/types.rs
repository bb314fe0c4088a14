use serde::{Serialize, Deserialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use crate::core::error::{Error, ErrorKind, IoResultExt, Result};

/// Document identifier: the file's basename, e.g. `doc1.txt`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basename of a path; non UTF-8 names are rejected
    pub fn from_path(path: &Path) -> Result<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(DocId::new)
            .ok_or_else(|| Error::new(
                ErrorKind::Input,
                format!("{}: document name is not valid UTF-8", path.display()),
            ))
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map task identifier, unique within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

/// Reduce bucket in `[0, num_reducers)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parallel phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Map => f.write_str("map"),
            Phase::Reduce => f.write_str("reduce"),
        }
    }
}

/// An input document discovered on disk
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub path: PathBuf,
}

impl Document {
    pub fn new(path: PathBuf) -> Result<Self> {
        let id = DocId::from_path(&path)?;
        Ok(Document { id, path })
    }

    /// Read the raw UTF-8 text
    pub fn load(&self) -> Result<String> {
        fs::read_to_string(&self.path).at_path(&self.path)
    }
}

/// A single (term, document) occurrence
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Posting {
    pub term: String,
    pub doc_id: DocId,
}

/// A term with its sorted, deduplicated document list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub term: String,
    pub docs: Vec<DocId>,  // Ascending byte order, no duplicates
}
