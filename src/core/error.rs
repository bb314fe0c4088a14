use std::fmt;
use crate::core::types::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Input,           // Input directory missing or unreadable
    Format,          // Malformed intermediate or index line
    WorkerFailure,   // One or more map/reduce tasks failed
    InvalidArgument,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub failures: Vec<TaskFailure>,  // Populated for WorkerFailure only
}

/// One failed map or reduce task
#[derive(Debug)]
pub struct TaskFailure {
    pub phase: Phase,
    pub task_id: usize,   // Worker id for map tasks, partition id for reduce tasks
    pub error: Error,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error {
            kind,
            context,
            failures: Vec::new(),
        }
    }

    pub fn io(context: String) -> Self {
        Error::new(ErrorKind::Io, context)
    }

    pub fn format(line_number: usize, line: &str, reason: &str) -> Self {
        Error::new(
            ErrorKind::Format,
            format!("line {}: {}: {:?}", line_number, reason, line),
        )
    }

    /// Aggregate every failed task of a phase into a single error
    pub fn phase_failed(phase: Phase, mut failures: Vec<TaskFailure>) -> Self {
        failures.sort_by_key(|f| f.task_id);

        let tasks: Vec<String> = failures.iter()
            .map(|f| f.task_id.to_string())
            .collect();

        Error {
            kind: ErrorKind::WorkerFailure,
            context: format!(
                "{} phase failed: {} task(s) failed [{}]",
                phase,
                failures.len(),
                tasks.join(", ")
            ),
            failures,
        }
    }

    /// Prefix the context with the path or operation that failed
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.context = format!("{}: {}", context, self.context);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} task {}: {}", self.phase, self.task_id, self.error)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Format, err.to_string())
    }
}

/// Attach a path to io errors
pub trait IoResultExt<T> {
    fn at_path(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| Error::io(format!("{}: {}", path.display(), e)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
