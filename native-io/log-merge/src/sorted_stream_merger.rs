use async_stream::try_stream;
use futures::future::try_join_all;
use futures::{pin_mut, Stream, TryStreamExt};
use tracing::{debug, info_span, Instrument};

use crate::error::Result;
use crate::merge_config::MergeConfig;
use crate::merge_traits::{AsyncLogSource, Printer};
use crate::min_heap_combiner::MinHeapSlotCombiner;
use crate::sorted_merger::{MergeProgress, MergeSummary};

/// Merges sources whose pulls may suspend.
///
/// The first record of every source is requested concurrently; after that one
/// replacement pull is awaited per emitted record, so the output order only
/// depends on the keys and never on how fast a source answers.
#[derive(Debug, Clone, Default)]
pub struct AsyncSortedMerger {
    config: MergeConfig,
}

impl AsyncSortedMerger {
    pub fn new(config: MergeConfig) -> Self {
        AsyncSortedMerger { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Prints every record of `sources` in ascending key order, then completes `printer`.
    ///
    /// A failing pull aborts the merge, pending initial pulls are dropped and
    /// `printer.done()` is not called.
    pub async fn merge<S, P>(&self, sources: &mut [S], printer: &mut P) -> Result<MergeSummary>
    where
        S: AsyncLogSource,
        P: Printer<S::Record> + ?Sized,
    {
        let span = info_span!("async_sorted_merge", name = %self.config.name(), sources = sources.len());
        async move {
            let mut progress = MergeProgress::start(sources.len(), &self.config);
            let merged = merged_stream(&self.config, sources);
            pin_mut!(merged);
            while let Some(record) = merged.try_next().await? {
                printer.print(record)?;
                progress.record_emitted();
            }
            printer.done()?;
            Ok(progress.finish())
        }
        .instrument(span)
        .await
    }

    /// Turns `sources` into a single stream of records in ascending key order.
    ///
    /// Nothing is pulled until the stream is first polled, and each replacement
    /// pull happens when the next record is requested. The stream ends after
    /// the first error.
    pub fn into_stream<S>(self, sources: Vec<S>) -> impl Stream<Item = Result<S::Record>>
    where
        S: AsyncLogSource,
    {
        try_stream! {
            let mut sources = sources;
            let merged = merged_stream(&self.config, &mut sources);
            pin_mut!(merged);
            while let Some(record) = merged.try_next().await? {
                yield record;
            }
        }
    }
}

fn merged_stream<'a, S>(
    config: &'a MergeConfig,
    sources: &'a mut [S],
) -> impl Stream<Item = Result<S::Record>> + 'a
where
    S: AsyncLogSource,
{
    try_stream! {
        let mut combiner = MinHeapSlotCombiner::new(sources.len(), config);
        let heads = try_join_all(sources.iter_mut().enumerate().map(|(stream_idx, source)| async move {
            source.pop_async().await.map_err(|e| e.in_source(stream_idx))
        }))
        .await?;
        for (stream_idx, head) in heads.into_iter().enumerate() {
            if let Some(record) = head {
                combiner.push(stream_idx, record)?;
            }
        }
        debug!(live_sources = combiner.len(), "heap populated");

        while let Some(slot) = combiner.pop() {
            let stream_idx = slot.stream_idx;
            yield slot.into_record();

            let next = sources[stream_idx].pop_async().await.map_err(|e| e.in_source(stream_idx))?;
            if let Some(record) = next {
                combiner.push(stream_idx, record)?;
            }
        }
    }
}

/// Merges `sources` into `printer` with the default [`MergeConfig`].
pub async fn merge_sorted_async<S, P>(sources: &mut [S], printer: &mut P) -> Result<MergeSummary>
where
    S: AsyncLogSource,
    P: Printer<S::Record> + ?Sized,
{
    AsyncSortedMerger::default().merge(sources, printer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use crate::log_entry::LogEntry;
    use crate::merge_traits::SortedRecord;
    use crate::printer::VecPrinter;
    use crate::source::VecSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn entries(millis: &[i64]) -> VecDeque<LogEntry> {
        millis
            .iter()
            .map(|m| LogEntry::at_millis(*m, format!("t{}", m)))
            .collect()
    }

    fn keys(records: &[LogEntry]) -> Vec<i64> {
        records.iter().map(|e| e.key().timestamp_millis()).collect()
    }

    /// Answers every pull after `delay`, optionally failing once drained.
    struct SlowSource {
        records: VecDeque<LogEntry>,
        delay: Duration,
        fail_when_drained: bool,
    }

    #[async_trait]
    impl AsyncLogSource for SlowSource {
        type Record = LogEntry;

        async fn pop_async(&mut self) -> Result<Option<LogEntry>> {
            tokio::time::sleep(self.delay).await;
            match self.records.pop_front() {
                None if self.fail_when_drained => Err(MergeError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "feed reset",
                ))),
                next => Ok(next),
            }
        }
    }

    fn slow(millis: &[i64], delay_ms: u64) -> SlowSource {
        SlowSource {
            records: entries(millis),
            delay: Duration::from_millis(delay_ms),
            fail_when_drained: false,
        }
    }

    #[tokio::test]
    async fn test_merge_three_sources() {
        let mut sources = vec![
            VecSource::new(vec![
                LogEntry::at_millis(1, "t1"),
                LogEntry::at_millis(4, "t4"),
                LogEntry::at_millis(7, "t7"),
            ]),
            VecSource::new(vec![LogEntry::at_millis(2, "t2"), LogEntry::at_millis(5, "t5")]),
            VecSource::new(vec![LogEntry::at_millis(3, "t3"), LogEntry::at_millis(6, "t6")]),
        ];
        let mut printer = VecPrinter::new();
        let summary = merge_sorted_async(&mut sources, &mut printer).await.unwrap();
        assert_eq!(keys(printer.records()), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(printer.done_calls(), 1);
        assert_eq!(summary.emitted, 7);
    }

    #[tokio::test]
    async fn test_order_does_not_depend_on_latency() {
        // the source holding the smallest keys is the slowest one
        let mut sources = vec![slow(&[1, 2, 9], 15), slow(&[3, 4], 0), slow(&[5, 6, 7, 8], 2)];
        let mut printer = VecPrinter::new();
        merge_sorted_async(&mut sources, &mut printer).await.unwrap();
        assert_eq!(keys(printer.records()), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(printer.done_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_sources_completes_printer() {
        let mut sources: Vec<VecSource<LogEntry>> = vec![];
        let mut printer = VecPrinter::new();
        merge_sorted_async(&mut sources, &mut printer).await.unwrap();
        assert!(printer.records().is_empty());
        assert_eq!(printer.done_calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_sources_complete_printer() {
        let mut sources = vec![slow(&[], 2), slow(&[], 0), slow(&[], 1)];
        let mut printer = VecPrinter::new();
        let summary = merge_sorted_async(&mut sources, &mut printer).await.unwrap();
        assert!(printer.records().is_empty());
        assert_eq!(printer.done_calls(), 1);
        assert_eq!(summary.sources, 3);
        assert_eq!(summary.emitted, 0);
    }

    #[tokio::test]
    async fn test_single_source_replays_it() {
        let mut sources = vec![slow(&[0, 3, 3, 8, 21], 1)];
        let mut printer = VecPrinter::new();
        merge_sorted_async(&mut sources, &mut printer).await.unwrap();
        assert_eq!(keys(printer.records()), vec![0, 3, 3, 8, 21]);
        assert_eq!(printer.done_calls(), 1);
    }

    /// Accepts `capacity` records, then fails every print with a broken pipe.
    struct FullPrinter {
        accepted: Vec<LogEntry>,
        capacity: usize,
        done_calls: usize,
    }

    impl Printer<LogEntry> for FullPrinter {
        fn print(&mut self, record: LogEntry) -> Result<()> {
            if self.accepted.len() == self.capacity {
                return Err(MergeError::Printer(std::io::ErrorKind::BrokenPipe.into()));
            }
            self.accepted.push(record);
            Ok(())
        }

        fn done(&mut self) -> Result<()> {
            self.done_calls += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_printer_failure_aborts_without_done() {
        let mut sources = vec![slow(&[1, 4, 7], 0), slow(&[2, 5], 1), slow(&[3, 6], 0)];
        let mut printer = FullPrinter {
            accepted: vec![],
            capacity: 2,
            done_calls: 0,
        };
        let err = merge_sorted_async(&mut sources, &mut printer).await.unwrap_err();
        assert!(matches!(err, MergeError::Printer(_)));
        assert_eq!(keys(&printer.accepted), vec![1, 2]);
        assert_eq!(printer.done_calls, 0);
    }

    #[tokio::test]
    async fn test_failure_after_first_record_aborts() {
        let mut failing = slow(&[2], 1);
        failing.fail_when_drained = true;
        let mut sources = vec![slow(&[1, 4, 7], 1), failing, slow(&[3, 6], 1)];
        let mut printer = VecPrinter::new();
        let err = merge_sorted_async(&mut sources, &mut printer).await.unwrap_err();
        assert_eq!(err.stream_idx(), Some(1));
        assert_eq!(keys(printer.records()), vec![1, 2]);
        assert_eq!(printer.done_calls(), 0);
    }

    #[tokio::test]
    async fn test_initial_failure_aborts_before_any_print() {
        let mut failing = slow(&[], 0);
        failing.fail_when_drained = true;
        let mut sources = vec![slow(&[1], 20), failing];
        let mut printer = VecPrinter::new();
        let err = merge_sorted_async(&mut sources, &mut printer).await.unwrap_err();
        assert_eq!(err.stream_idx(), Some(1));
        assert!(printer.records().is_empty());
        assert_eq!(printer.done_calls(), 0);
    }

    /// First pull only resolves once every source has started its first pull.
    struct RendezvousSource {
        barrier: Option<Arc<Barrier>>,
        records: VecDeque<LogEntry>,
    }

    #[async_trait]
    impl AsyncLogSource for RendezvousSource {
        type Record = LogEntry;

        async fn pop_async(&mut self) -> Result<Option<LogEntry>> {
            if let Some(barrier) = self.barrier.take() {
                barrier.wait().await;
            }
            Ok(self.records.pop_front())
        }
    }

    #[tokio::test]
    async fn test_initial_pulls_run_concurrently() {
        let barrier = Arc::new(Barrier::new(3));
        let mut sources: Vec<_> = [vec![3, 6], vec![1, 4], vec![2, 5]]
            .iter()
            .map(|millis| RendezvousSource {
                barrier: Some(barrier.clone()),
                records: entries(millis),
            })
            .collect();
        let mut printer = VecPrinter::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            merge_sorted_async(&mut sources, &mut printer),
        )
        .await
        .expect("initial pulls were not issued concurrently")
        .unwrap();
        assert_eq!(keys(printer.records()), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let sources = vec![slow(&[10, 30], 1), slow(&[20], 3), slow(&[], 0)];
        let merged: Vec<LogEntry> = AsyncSortedMerger::default()
            .into_stream(sources)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys(&merged), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_into_stream_ends_with_error() {
        let mut failing = slow(&[5], 0);
        failing.fail_when_drained = true;
        let results: Vec<Result<LogEntry>> = {
            use futures::StreamExt;
            AsyncSortedMerger::default()
                .into_stream(vec![slow(&[1, 9], 0), failing])
                .collect()
                .await
        };
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert_eq!(results[2].as_ref().unwrap_err().stream_idx(), Some(1));
    }
}
