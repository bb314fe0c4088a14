pub mod core;
pub mod analysis;
pub mod storage;
pub mod mapreduce;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::mapreduce::driver::IndexJob;

/*
┌──────────────────────────────────────────────────────────────────────────────────┐
│                              MINISEARCH PIPELINE                                  │
└──────────────────────────────────────────────────────────────────────────────────┘

  input_dir (*.txt)
        │  IndexJob::discover_documents (sorted by name, worker id = position)
        ▼
  ┌──────────────┐  Analyzer::terms ─► partition(term, R) = md5(term) mod R
  │ Mapper × M   │  parallel, rayon pool, one task per document
  └──────┬───────┘
         │  workspace/temp_mapper_{w}_part_{p}.out      "term\tdoc\n"
         ▼  ═════════════════ barrier: all mappers joined ═════════════════
  ┌──────────────┐
  │ ShuffleSort  │  per partition: concatenate ─► reducer_{p}_input.txt
  │   × R        │                 sort lines  ─► reducer_{p}_sorted_input.txt
  └──────┬───────┘  (empty partitions are skipped, no reducer runs)
         ▼
  ┌──────────────┐  Accumulator: Empty ⇄ Accumulating(term, docs)
  │ Reducer × R' │  parallel, one task per non-empty partition
  └──────┬───────┘
         │  output/part-r-{p:05}                        "term\t[\"doc\",...]\n"
         ▼  ═════════════════ barrier: all reducers joined ════════════════
  ┌──────────────┐
  │  aggregate   │  concatenate part-r-* in partition order
  └──────┬───────┘
         ▼
  output/inverted_index.txt   (partition-major, term-sorted within a partition)

  Any failed task: siblings are joined, the run stops with ErrorKind::WorkerFailure
  listing every failed task, and the workspace is left in place.
*/
