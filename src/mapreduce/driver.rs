use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, IoResultExt, Result, TaskFailure};
use crate::core::stats::{MapStats, PhaseTimings, ReduceStats, RunReport};
use crate::core::types::{Document, PartitionId, Phase, WorkerId};
use crate::mapreduce::aggregator::aggregate;
use crate::mapreduce::mapper::Mapper;
use crate::mapreduce::reducer::Reducer;
use crate::mapreduce::shuffle::{ShuffleSort, SortedPartition};
use crate::storage::layout::WorkspaceLayout;

const PROGRESS_INTERVAL: usize = 1000;

/// Owns one index build: discovery, the map barrier, shuffle/sort, the
/// reduce barrier, then aggregation.
///
/// Map and reduce tasks run on a dedicated rayon pool. A phase always joins
/// every task it launched before deciding whether to continue; any failure
/// aborts the run and leaves the workspace on disk.
pub struct IndexJob {
    pub config: Config,
    pub analyzer: Arc<Analyzer>,
    pub layout: WorkspaceLayout,
    pub progress: Arc<AtomicUsize>,
    pool: rayon::ThreadPool,
}

impl IndexJob {
    pub fn new(config: Config) -> Result<Self> {
        IndexJob::with_analyzer(config, Analyzer::standard_english())
    }

    pub fn with_analyzer(config: Config, analyzer: Analyzer) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("minisearch-worker-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("Failed to build worker pool: {}", e)))?;

        Ok(IndexJob {
            layout: WorkspaceLayout::new(&config),
            config,
            analyzer: Arc::new(analyzer),
            progress: Arc::new(AtomicUsize::new(0)),
            pool,
        })
    }

    /// Documents completed by the map phase of the current run
    pub fn get_progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("run", %run_id);
        let _guard = span.enter();

        let num_reducers = self.config.num_reducers;
        let mut timings = PhaseTimings::default();

        // Setup failures abort before any task starts
        let documents = self.discover_documents()?;
        let document_count = documents.len();
        self.layout.reset()?;
        info!(documents = document_count, num_reducers, "Starting index build");

        // Map
        let clock = Instant::now();
        let map_stats = self.run_map_phase(documents)?;
        let postings_emitted: u64 = map_stats.iter().map(|s| s.postings).sum();
        timings.map_ms = clock.elapsed().as_millis() as u64;
        info!(documents = document_count, postings_emitted, elapsed_ms = timings.map_ms, "Map phase completed");

        // Shuffle and sort
        let clock = Instant::now();
        let shuffle = ShuffleSort::new(&self.layout, self.config.sort_buffer_bytes);
        let mut sorted: Vec<SortedPartition> = Vec::new();
        let mut partitions_skipped = 0;

        for p in 0..num_reducers {
            match shuffle.prepare(PartitionId(p))? {
                Some(partition) => sorted.push(partition),
                None => {
                    info!(partition = p, "No data for partition, skipping");
                    partitions_skipped += 1;
                }
            }
        }
        timings.shuffle_ms = clock.elapsed().as_millis() as u64;

        // Reduce
        let clock = Instant::now();
        let reduce_stats = self.run_reduce_phase(&sorted)?;
        let index_entries: u64 = reduce_stats.iter().map(|s| s.entries_written).sum();
        timings.reduce_ms = clock.elapsed().as_millis() as u64;
        info!(
            partitions = sorted.len(),
            partitions_skipped,
            index_entries,
            elapsed_ms = timings.reduce_ms,
            "Reduce phase completed"
        );

        // Aggregate
        let clock = Instant::now();
        let index_size_bytes = aggregate(&self.layout)?;
        timings.aggregate_ms = clock.elapsed().as_millis() as u64;
        info!(
            path = %self.layout.index_path.display(),
            bytes = index_size_bytes,
            "Final index written"
        );

        Ok(RunReport {
            run_id,
            started_at,
            num_reducers,
            documents: document_count,
            postings_emitted,
            partitions_reduced: sorted.len(),
            partitions_skipped,
            index_entries,
            index_path: self.layout.index_path.clone(),
            index_size_bytes,
            timings,
        })
    }

    /// Eligible files directly under the input directory, ordered by name.
    /// Files whose names are not valid UTF-8 are logged and left out.
    pub fn discover_documents(&self) -> Result<Vec<Document>> {
        let dir = &self.config.input_dir;
        let entries = fs::read_dir(dir).map_err(|e| Error::new(
            ErrorKind::Input,
            format!("Cannot read input directory {}: {}", dir.display(), e),
        ))?;

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry.at_path(dir)?.path();
            if !path.is_file() || !self.config.is_eligible(&path) {
                continue;
            }
            // A name that cannot become a document id skips that file only
            match Document::new(path) {
                Ok(doc) => documents.push(doc),
                Err(err) => warn!(error = %err, "Skipping document"),
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));

        if documents.is_empty() {
            warn!(dir = %dir.display(), "No eligible documents found, the index will be empty");
        }
        Ok(documents)
    }

    fn run_map_phase(&self, documents: Vec<Document>) -> Result<Vec<MapStats>> {
        self.progress.store(0, Ordering::Relaxed);
        let total = documents.len();
        let tasks: Vec<(usize, Document)> = documents.into_iter().enumerate().collect();

        self.run_phase(Phase::Map, &tasks, |worker, doc| {
            let mapper = Mapper::new(
                WorkerId(worker),
                self.config.num_reducers,
                &self.analyzer,
                &self.layout,
            );
            let stats = mapper.run(doc)?;

            let done = self.progress.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 {
                info!("Mapping progress: {}% ({}/{})", done * 100 / total, done, total);
            }
            Ok(stats)
        })
    }

    fn run_reduce_phase(&self, sorted: &[SortedPartition]) -> Result<Vec<ReduceStats>> {
        let tasks: Vec<(usize, &SortedPartition)> = sorted.iter()
            .map(|s| (s.partition.0, s))
            .collect();

        self.run_phase(Phase::Reduce, &tasks, |_, partition| {
            Reducer::new(partition.partition, &self.layout).run(&partition.path)
        })
    }

    /// Run every task on the pool and join them all. A task that errors or
    /// panics becomes a `TaskFailure`; any failure fails the phase.
    fn run_phase<T, S, F>(&self, phase: Phase, tasks: &[(usize, T)], task: F) -> Result<Vec<S>>
    where
        T: Sync,
        S: Send,
        F: Fn(usize, &T) -> Result<S> + Sync,
    {
        debug!(%phase, tasks = tasks.len(), "Launching tasks");

        let outcomes: Vec<(usize, Result<S>)> = self.pool.install(|| {
            tasks.par_iter()
                .map(|(task_id, input)| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(*task_id, input)))
                        .unwrap_or_else(|payload| Err(Error::new(
                            ErrorKind::WorkerFailure,
                            format!("task panicked: {}", panic_message(&*payload)),
                        )));
                    (*task_id, outcome)
                })
                .collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (task_id, outcome) in outcomes {
            match outcome {
                Ok(stats) => results.push(stats),
                Err(err) => {
                    error!(%phase, task_id, error = %err, "Task failed");
                    failures.push(TaskFailure { phase, task_id, error: err });
                }
            }
        }

        if !failures.is_empty() {
            return Err(Error::phase_failed(phase, failures));
        }
        Ok(results)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
