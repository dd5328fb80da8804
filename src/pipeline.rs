//! Threaded read → align → write pipeline.
//!
//! One reader, `workers` aligners and one writer run inside a `std::thread::scope`. Pairs and
//! results move through two [`ThreadSafeQueue`]s. The stop flag and the two progress counters
//! are [`Signal`]s. Output order follows worker completion, not input order.

use crate::aligner::AmpliconAligner;
use crate::builder::AlignmentBuilder;
use crate::fastq::PairedReader;
use crate::queue::{Signal, ThreadSafeQueue};
use crate::read::ReadPair;
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Backpressure threshold for both queues.
    pub queue_limit: usize,
    /// Longest single wait inside a stage loop before the stop flag is re-checked.
    pub poll_interval: Duration,
    /// Longest wait between completion checks in the manager.
    pub completion_poll: Duration,
    /// Abort when no result is written for this long while pairs are outstanding.
    pub stall_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_limit: 5000,
            poll_interval: Duration::from_millis(1),
            completion_poll: Duration::from_secs(1),
            stall_timeout: Some(Duration::from_secs(600)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub read_pairs: u64,
    pub aligned_pairs: u64,
    pub written_pairs: u64,
    pub mapped_records: u64,
    pub unmapped_records: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    pub written_pairs: u64,
    pub mapped_records: u64,
    pub unmapped_records: u64,
}

/// State shared by all stages of one run.
#[derive(Debug)]
pub struct Shared {
    pub input: ThreadSafeQueue<ReadPair>,
    pub output: ThreadSafeQueue<AlignmentBuilder>,
    pub stop: Signal<bool>,
    pub read_count: Signal<u64>,
    pub write_count: Signal<u64>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            input: ThreadSafeQueue::new(),
            output: ThreadSafeQueue::new(),
            stop: Signal::new(false),
            read_count: Signal::new(0),
            write_count: Signal::new(0),
        }
    }
}

/// Raises the stop flag if the owning thread unwinds, so the other stages do not wait on it.
struct StopOnPanic<'a>(&'a Signal<bool>);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.set(true);
        }
    }
}

/// Sole producer of read pairs.
pub struct Reader<'a> {
    source: PairedReader,
    shared: &'a Shared,
    config: &'a PipelineConfig,
}

impl<'a> Reader<'a> {
    pub fn new(source: PairedReader, shared: &'a Shared, config: &'a PipelineConfig) -> Self {
        Self {
            source,
            shared,
            config,
        }
    }

    /// Returns the number of pairs queued.
    pub fn run(mut self) -> u64 {
        let shared = self.shared;
        let _guard = StopOnPanic(&shared.stop);
        let limit = self.config.queue_limit;
        let mut produced = 0u64;
        while !self.shared.stop.get() {
            if !self
                .shared
                .input
                .wait_while_len(self.config.poll_interval, |len| len >= limit)
            {
                continue;
            }
            let Some(pair) = self.source.next_pair() else {
                break;
            };
            self.shared.input.push(pair);
            produced += 1;
            self.shared.read_count.update(|count| count + 1);
        }
        produced
    }
}

/// Pops read pairs, aligns them and queues the results.
pub struct Worker<'a> {
    id: usize,
    aligner: &'a AmpliconAligner<'a>,
    shared: &'a Shared,
    config: &'a PipelineConfig,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        aligner: &'a AmpliconAligner<'a>,
        shared: &'a Shared,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            id,
            aligner,
            shared,
            config,
        }
    }

    /// Runs until the stop flag is raised. Returns the number of pairs aligned.
    pub fn run(self) -> u64 {
        let shared = self.shared;
        let _guard = StopOnPanic(&shared.stop);
        let limit = self.config.queue_limit;
        let mut aligned = 0u64;
        loop {
            if self.shared.stop.get() {
                break;
            }
            if !self
                .shared
                .output
                .wait_while_len(self.config.poll_interval, |len| len > limit)
            {
                continue;
            }
            if let Some(pair) = self.shared.input.pop_timeout(self.config.poll_interval) {
                let result = self.aligner.align(pair);
                self.shared.output.push(result);
                aligned += 1;
            }
        }
        tracing::debug!(worker = self.id, aligned, "worker stopped");
        aligned
    }
}

/// Sole consumer of results and sole owner of the output stream.
pub struct Writer<'a, W: Write> {
    out: W,
    shared: &'a Shared,
    config: &'a PipelineConfig,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(out: W, shared: &'a Shared, config: &'a PipelineConfig) -> Self {
        Self {
            out,
            shared,
            config,
        }
    }

    /// Drains results until the stop flag is raised and the queue is empty.
    pub fn run(mut self) -> Result<WriterStats> {
        let shared = self.shared;
        let _guard = StopOnPanic(&shared.stop);
        let result = self.drain();
        if result.is_err() {
            shared.stop.set(true);
        }
        result
    }

    fn drain(&mut self) -> Result<WriterStats> {
        let mut stats = WriterStats::default();
        loop {
            let Some(result) = self.shared.output.pop_timeout(self.config.poll_interval) else {
                if self.shared.stop.get() {
                    break;
                }
                continue;
            };

            if result.has_records() {
                for record in result.records() {
                    writeln!(self.out, "{record}").context("failed to write SAM record")?;
                    if record.is_unmapped() {
                        stats.unmapped_records += 1;
                    } else {
                        stats.mapped_records += 1;
                    }
                }
            } else {
                for record in result.unmapped_records() {
                    writeln!(self.out, "{record}").context("failed to write SAM record")?;
                    stats.unmapped_records += 1;
                }
            }
            drop(result);

            stats.written_pairs += 1;
            self.shared.write_count.update(|count| count + 1);
        }
        self.out.flush().context("failed to flush SAM output")?;
        Ok(stats)
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>, role: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("{role} thread panicked"))
}

/// Wires the stages together and decides when the run is complete.
pub struct Manager<'a> {
    aligner: &'a AmpliconAligner<'a>,
    config: PipelineConfig,
}

impl<'a> Manager<'a> {
    pub fn new(aligner: &'a AmpliconAligner<'a>, config: PipelineConfig) -> Result<Self> {
        if config.workers == 0 {
            bail!("at least one worker thread is required");
        }
        if config.queue_limit == 0 {
            bail!("queue limit must be positive");
        }
        Ok(Self { aligner, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Align every pair from `source` and write SAM records to `out`. The header, if any, must
    /// already have been written.
    pub fn run<W: Write + Send>(&self, source: PairedReader, out: W) -> Result<Stats> {
        let shared = Shared::default();
        let shared = &shared;
        let config = &self.config;
        let aligner = self.aligner;
        let started = Instant::now();

        thread::scope(|scope| -> Result<Stats> {
            let writer = scope.spawn(move || Writer::new(out, shared, config).run());
            let workers: Vec<_> = (0..config.workers)
                .map(move |id| scope.spawn(move || Worker::new(id, aligner, shared, config).run()))
                .collect();
            let reader = scope.spawn(move || Reader::new(source, shared, config).run());
            tracing::debug!(workers = config.workers, "pipeline started");

            let read_pairs = join(reader, "reader")?;
            tracing::debug!(read_pairs, "reader finished");

            let completion = self.wait_for_writer(shared, read_pairs);
            shared.stop.set(true);

            let aligned: Vec<Result<u64>> =
                workers.into_iter().map(|w| join(w, "worker")).collect();
            let written = join(writer, "writer");
            let aligned_pairs = aligned.into_iter().sum::<Result<u64>>()?;
            tracing::debug!(aligned_pairs, "workers joined");
            let written = written??;
            completion?;
            tracing::debug!(
                written = written.written_pairs,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "writer joined"
            );

            Ok(Stats {
                read_pairs,
                aligned_pairs,
                written_pairs: written.written_pairs,
                mapped_records: written.mapped_records,
                unmapped_records: written.unmapped_records,
            })
        })
    }

    /// Block until the writer has caught up with the reader.
    fn wait_for_writer(&self, shared: &Shared, read_pairs: u64) -> Result<()> {
        let mut written = shared.write_count.get();
        let mut last_progress = Instant::now();
        loop {
            if written >= read_pairs {
                return Ok(());
            }
            if shared.stop.get() {
                bail!("pipeline stopped after writing {written} of {read_pairs} read pairs");
            }
            let now = shared
                .write_count
                .wait_change(&written, self.config.completion_poll);
            if now != written {
                written = now;
                last_progress = Instant::now();
            } else if let Some(limit) = self.config.stall_timeout
                && last_progress.elapsed() >= limit
            {
                tracing::error!(
                    written,
                    read_pairs,
                    queued_pairs = shared.input.len(),
                    queued_results = shared.output.len(),
                    "no progress for {:?}",
                    limit
                );
                bail!("pipeline stalled after writing {written} of {read_pairs} read pairs");
            }
        }
    }
}
