use std::time::{Duration, Instant};

use tracing::{debug, info, info_span};

use crate::error::Result;
use crate::merge_config::MergeConfig;
use crate::merge_traits::{LogSource, Printer};
use crate::min_heap_combiner::MinHeapSlotCombiner;

/// Outcome of a completed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub sources: usize,
    pub emitted: usize,
    pub elapsed: Duration,
}

impl MergeSummary {
    /// Emitted records per second, 0 for an instantaneous merge.
    pub fn records_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.emitted as f64 / secs
        } else {
            0.0
        }
    }
}

/// Counts emitted records and logs every `interval` of them.
#[derive(Debug)]
pub(crate) struct MergeProgress {
    sources: usize,
    interval: usize,
    emitted: usize,
    start: Instant,
}

impl MergeProgress {
    pub(crate) fn start(sources: usize, config: &MergeConfig) -> Self {
        MergeProgress {
            sources,
            interval: config.progress_interval(),
            emitted: 0,
            start: Instant::now(),
        }
    }

    pub(crate) fn record_emitted(&mut self) {
        self.emitted += 1;
        if self.interval > 0 && self.emitted % self.interval == 0 {
            debug!(emitted = self.emitted, elapsed = ?self.start.elapsed(), "merge progress");
        }
    }

    pub(crate) fn finish(self) -> MergeSummary {
        let summary = MergeSummary {
            sources: self.sources,
            emitted: self.emitted,
            elapsed: self.start.elapsed(),
        };
        info!(
            sources = summary.sources,
            emitted = summary.emitted,
            elapsed = ?summary.elapsed,
            "merge done"
        );
        summary
    }
}

/// Merges sources that can be pulled synchronously.
#[derive(Debug, Clone, Default)]
pub struct SortedMerger {
    config: MergeConfig,
}

impl SortedMerger {
    pub fn new(config: MergeConfig) -> Self {
        SortedMerger { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Prints every record of `sources` in ascending key order, then completes `printer`.
    ///
    /// Only the head record of each source is held in memory. A failing pull
    /// aborts the merge before `printer.done()` is reached.
    pub fn merge<S, P>(&self, sources: &mut [S], printer: &mut P) -> Result<MergeSummary>
    where
        S: LogSource,
        P: Printer<S::Record> + ?Sized,
    {
        let span = info_span!("sorted_merge", name = %self.config.name(), sources = sources.len());
        let _guard = span.enter();

        let mut progress = MergeProgress::start(sources.len(), &self.config);
        let mut combiner = MinHeapSlotCombiner::new(sources.len(), &self.config);
        for (stream_idx, source) in sources.iter_mut().enumerate() {
            if let Some(record) = source.pop().map_err(|e| e.in_source(stream_idx))? {
                combiner.push(stream_idx, record)?;
            }
        }
        debug!(live_sources = combiner.len(), "heap populated");

        while let Some(slot) = combiner.pop() {
            let stream_idx = slot.stream_idx;
            printer.print(slot.into_record())?;
            progress.record_emitted();

            if let Some(record) = sources[stream_idx].pop().map_err(|e| e.in_source(stream_idx))? {
                combiner.push(stream_idx, record)?;
            }
        }

        printer.done()?;
        Ok(progress.finish())
    }
}

/// Merges `sources` into `printer` with the default [`MergeConfig`].
pub fn merge_sorted<S, P>(sources: &mut [S], printer: &mut P) -> Result<MergeSummary>
where
    S: LogSource,
    P: Printer<S::Record> + ?Sized,
{
    SortedMerger::default().merge(sources, printer)
}
