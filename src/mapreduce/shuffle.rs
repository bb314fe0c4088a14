use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::core::error::{IoResultExt, Result};
use crate::core::types::PartitionId;
use crate::storage::layout::WorkspaceLayout;

/// Most spill runs held open by a single merge pass
pub const MERGE_FAN_IN: usize = 64;

/// A partition ready for its reducer
#[derive(Debug, Clone)]
pub struct SortedPartition {
    pub partition: PartitionId,
    pub path: PathBuf,
    pub lines: u64,
}

/// Shuffle and sort for one partition at a time.
///
/// Lines are ordered by the bytes of the whole `term\tdoc` line. Tab sorts
/// below every letter, so records for one term end up contiguous with their
/// documents in ascending order.
pub struct ShuffleSort<'a> {
    pub layout: &'a WorkspaceLayout,
    pub sort_buffer_bytes: usize,
}

impl<'a> ShuffleSort<'a> {
    pub fn new(layout: &'a WorkspaceLayout, sort_buffer_bytes: usize) -> Self {
        ShuffleSort {
            layout,
            sort_buffer_bytes,
        }
    }

    /// `None` when no mapper produced anything for `partition`
    pub fn prepare(&self, partition: PartitionId) -> Result<Option<SortedPartition>> {
        let sources = self.layout.intermediate_files(partition)?;
        if sources.is_empty() {
            return Ok(None);
        }

        let shuffled = self.layout.shuffled_path(partition);
        let bytes = concatenate(&sources, &shuffled)?;

        let sorted = self.layout.sorted_path(partition);
        let lines = external_sort(&shuffled, &sorted, self.sort_buffer_bytes, |run| {
            self.layout.sort_run_path(partition, run)
        })?;

        debug!(
            partition = partition.0,
            sources = sources.len(),
            bytes,
            lines,
            "Shuffled and sorted partition"
        );

        if lines == 0 {
            return Ok(None);
        }

        Ok(Some(SortedPartition {
            partition,
            path: sorted,
            lines,
        }))
    }
}

/// Byte-concatenate `sources` into `target`
pub fn concatenate(sources: &[PathBuf], target: &Path) -> Result<u64> {
    let mut out = BufWriter::new(File::create(target).at_path(target)?);
    let mut total = 0;

    for source in sources {
        let mut input = File::open(source).at_path(source)?;
        total += io::copy(&mut input, &mut out).at_path(target)?;
    }

    out.flush().at_path(target)?;
    Ok(total)
}

/// Sort the lines of `input` into `output`, returning the line count.
///
/// Up to `buffer_bytes` of lines are sorted in memory at once. Larger inputs
/// are cut into sorted runs at `run_path(k)` and k-way merged, at most
/// `MERGE_FAN_IN` runs at a time; the runs are removed once merged. Both paths
/// produce the same bytes.
pub fn external_sort<F>(input: &Path, output: &Path, buffer_bytes: usize, run_path: F) -> Result<u64>
where
    F: Fn(usize) -> PathBuf,
{
    let reader = BufReader::new(File::open(input).at_path(input)?);
    let mut chunk: Vec<String> = Vec::new();
    let mut chunk_bytes = 0usize;
    let mut runs: Vec<PathBuf> = Vec::new();
    let mut total = 0u64;

    for line in reader.lines() {
        let line = line.at_path(input)?;
        chunk_bytes += line.len() + 1;
        chunk.push(line);
        total += 1;

        if chunk_bytes >= buffer_bytes {
            let path = run_path(runs.len());
            write_sorted(&mut chunk, &path)?;
            runs.push(path);
            chunk_bytes = 0;
        }
    }

    if runs.is_empty() {
        write_sorted(&mut chunk, output)?;
        return Ok(total);
    }

    if !chunk.is_empty() {
        let path = run_path(runs.len());
        write_sorted(&mut chunk, &path)?;
        runs.push(path);
    }

    let mut next_run = runs.len();
    while runs.len() > MERGE_FAN_IN {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(MERGE_FAN_IN));
        for group in runs.chunks(MERGE_FAN_IN) {
            let path = run_path(next_run);
            next_run += 1;
            merge_runs(group, &path)?;
            remove_runs(group)?;
            merged.push(path);
        }
        debug!(from = runs.len(), to = merged.len(), "Intermediate merge pass");
        runs = merged;
    }

    merge_runs(&runs, output)?;
    remove_runs(&runs)?;

    Ok(total)
}

fn remove_runs(runs: &[PathBuf]) -> Result<()> {
    for run in runs {
        fs::remove_file(run).at_path(run)?;
    }
    Ok(())
}

fn write_sorted(lines: &mut Vec<String>, path: &Path) -> Result<()> {
    lines.sort_unstable();

    let mut out = BufWriter::new(File::create(path).at_path(path)?);
    for line in lines.drain(..) {
        out.write_all(line.as_bytes()).at_path(path)?;
        out.write_all(b"\n").at_path(path)?;
    }
    out.flush().at_path(path)
}

fn merge_runs(runs: &[PathBuf], output: &Path) -> Result<()> {
    let mut readers: Vec<Lines<BufReader<File>>> = Vec::with_capacity(runs.len());
    for run in runs {
        readers.push(BufReader::new(File::open(run).at_path(run)?).lines());
    }

    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (idx, reader) in readers.iter_mut().enumerate() {
        if let Some(line) = reader.next() {
            heap.push(Reverse((line.at_path(&runs[idx])?, idx)));
        }
    }

    let mut out = BufWriter::new(File::create(output).at_path(output)?);
    while let Some(Reverse((line, idx))) = heap.pop() {
        out.write_all(line.as_bytes()).at_path(output)?;
        out.write_all(b"\n").at_path(output)?;

        if let Some(next) = readers[idx].next() {
            heap.push(Reverse((next.at_path(&runs[idx])?, idx)));
        }
    }

    out.flush().at_path(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::types::WorkerId;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn layout_in(dir: &Path) -> WorkspaceLayout {
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
    fn whole_line_order_groups_terms() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "cats\tdoc1.txt\ncat\tdoc2.txt\ncat\tdoc1.txt\nca\tdoc3.txt\ncat\tdoc10.txt\n").unwrap();

        let lines = external_sort(&input, &output, 1 << 20, |k| dir.path().join(format!("run{}", k))).unwrap();
        assert_eq!(lines, 5);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "ca\tdoc3.txt\ncat\tdoc1.txt\ncat\tdoc10.txt\ncat\tdoc2.txt\ncats\tdoc1.txt\n"
        );
    }

    #[test]
    fn spilled_runs_match_in_memory_sort() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let mut rng = StdRng::seed_from_u64(7);

        let mut lines: Vec<String> = (0..2000)
            .map(|_| format!("t{}\tdoc{}.txt", rng.gen_range(0..300), rng.gen_range(0..40)))
            .collect();
        lines.shuffle(&mut rng);
        fs::write(&input, lines.join("\n") + "\n").unwrap();

        let in_memory = dir.path().join("memory.txt");
        let spilled = dir.path().join("spilled.txt");
        external_sort(&input, &in_memory, 1 << 24, |k| dir.path().join(format!("a{}", k))).unwrap();
        let count = external_sort(&input, &spilled, 512, |k| dir.path().join(format!("b{}", k))).unwrap();

        assert_eq!(count, 2000);
        assert_eq!(fs::read(&in_memory).unwrap(), fs::read(&spilled).unwrap());
        assert!(!dir.path().join("b0").exists(), "spill runs are cleaned up");
    }

    #[test]
    fn more_runs_than_fan_in_merge_in_passes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let mut rng = StdRng::seed_from_u64(11);

        // One line per run, well past a single pass
        let count = MERGE_FAN_IN * 3 + 5;
        let mut lines: Vec<String> = (0..count)
            .map(|i| format!("w{}\tdoc{}.txt", i % 50, rng.gen_range(0..9)))
            .collect();
        lines.shuffle(&mut rng);
        fs::write(&input, lines.join("\n") + "\n").unwrap();

        let runs_dir = dir.path().join("runs");
        fs::create_dir(&runs_dir).unwrap();
        let output = dir.path().join("out.txt");
        let sorted = external_sort(&input, &output, 1, |k| runs_dir.join(format!("r{}", k))).unwrap();

        lines.sort();
        assert_eq!(sorted, count as u64);
        assert_eq!(fs::read_to_string(&output).unwrap(), lines.join("\n") + "\n");
        assert_eq!(fs::read_dir(&runs_dir).unwrap().count(), 0);
    }

    #[test]
    fn partition_without_sources_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let shuffle = ShuffleSort::new(&layout, 1 << 20);

        assert!(shuffle.prepare(PartitionId(0)).unwrap().is_none());
        assert!(!layout.shuffled_path(PartitionId(0)).exists());
    }

    #[test]
    fn merges_all_workers_for_a_partition() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        fs::write(layout.intermediate_path(WorkerId(1), PartitionId(0)), "sat\tdoc2.txt\ndog\tdoc2.txt\n").unwrap();
        fs::write(layout.intermediate_path(WorkerId(0), PartitionId(0)), "sat\tdoc1.txt\ncat\tdoc1.txt\n").unwrap();
        fs::write(layout.intermediate_path(WorkerId(0), PartitionId(1)), "other\tdoc1.txt\n").unwrap();

        let sorted = ShuffleSort::new(&layout, 1 << 20)
            .prepare(PartitionId(0))
            .unwrap()
            .unwrap();

        assert_eq!(sorted.lines, 4);
        assert_eq!(
            fs::read_to_string(&sorted.path).unwrap(),
            "cat\tdoc1.txt\ndog\tdoc2.txt\nsat\tdoc1.txt\nsat\tdoc2.txt\n"
        );
        assert!(layout.shuffled_path(PartitionId(0)).exists());
    }
}
