use tracing::warn;

use crate::error::{MergeError, Result};
use crate::merge_config::{MergeConfig, OrderCheck, TieBreak};
use crate::merge_traits::SortedRecord;
use crate::min_heap::MinHeap;

/// The pending head record of one source.
///
/// The record's key is extracted once when the slot is queued.
#[derive(Debug)]
pub struct Slot<R: SortedRecord> {
    pub stream_idx: usize,
    pub record: R,
    key: R::Key,
    tie: u64,
}

impl<R: SortedRecord> Slot<R> {
    pub fn into_record(self) -> R {
        self.record
    }
}

type SlotKey<R> = (<R as SortedRecord>::Key, u64);

fn slot_key<R: SortedRecord>(slot: &Slot<R>) -> SlotKey<R> {
    (slot.key.clone(), slot.tie)
}

/// Holds at most one pending record per source and hands them out smallest key first.
///
/// Equal keys are resolved by [`TieBreak`], so the output order is fully deterministic.
#[derive(Debug)]
pub struct MinHeapSlotCombiner<R: SortedRecord> {
    heap: MinHeap<Slot<R>, SlotKey<R>, fn(&Slot<R>) -> SlotKey<R>>,
    tie_break: TieBreak,
    order_check: OrderCheck,
    next_seq: u64,
    last_keys: Vec<Option<R::Key>>,
}

impl<R: SortedRecord> MinHeapSlotCombiner<R> {
    pub fn new(streams_num: usize, config: &MergeConfig) -> Self {
        MinHeapSlotCombiner {
            heap: MinHeap::with_capacity(streams_num, slot_key::<R> as fn(&Slot<R>) -> SlotKey<R>),
            tie_break: config.tie_break(),
            order_check: config.order_check(),
            next_seq: 0,
            last_keys: vec![None; streams_num],
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queues `record` as the pending head of source `stream_idx`.
    pub fn push(&mut self, stream_idx: usize, record: R) -> Result<()> {
        let key = record.key();
        self.check_order(stream_idx, &key)?;
        let tie = match self.tie_break {
            TieBreak::SourceIndex => stream_idx as u64,
            TieBreak::InsertionOrder => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.heap.push(Slot {
            stream_idx,
            record,
            key,
            tie,
        });
        Ok(())
    }

    /// Removes the slot with the smallest key, `None` once every source is drained.
    pub fn pop(&mut self) -> Option<Slot<R>> {
        self.heap.pop()
    }

    fn check_order(&mut self, stream_idx: usize, key: &R::Key) -> Result<()> {
        if self.order_check == OrderCheck::Off {
            return Ok(());
        }
        if stream_idx >= self.last_keys.len() {
            return Err(MergeError::Internal(format!(
                "slot for source {} pushed into a combiner of {} sources",
                stream_idx,
                self.last_keys.len()
            )));
        }
        if let Some(previous) = &self.last_keys[stream_idx] {
            if key < previous {
                match self.order_check {
                    OrderCheck::Fail => {
                        return Err(MergeError::OutOfOrder {
                            origin: format!("source {}", stream_idx),
                            previous: format!("{:?}", previous),
                            current: format!("{:?}", key),
                        }
                        .in_source(stream_idx));
                    }
                    _ => warn!(
                        stream_idx,
                        ?previous,
                        current = ?key,
                        "source yielded a record out of order, merged output may be unsorted"
                    ),
                }
            }
        }
        self.last_keys[stream_idx] = Some(key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_entry::LogEntry;
    use std::cell::Cell;
    use std::rc::Rc;

    fn drain(combiner: &mut MinHeapSlotCombiner<LogEntry>) -> Vec<(usize, String)> {
        std::iter::from_fn(|| combiner.pop())
            .map(|slot| (slot.stream_idx, slot.record.msg))
            .collect()
    }

    #[test]
    fn test_source_index_tie_break() {
        let config = MergeConfig::builder().with_order_check(OrderCheck::Off).build();
        let mut combiner = MinHeapSlotCombiner::new(3, &config);
        combiner.push(2, LogEntry::at_millis(10, "c")).unwrap();
        combiner.push(0, LogEntry::at_millis(10, "a")).unwrap();
        combiner.push(1, LogEntry::at_millis(10, "b")).unwrap();
        combiner.push(1, LogEntry::at_millis(5, "first")).unwrap();
        assert_eq!(combiner.len(), 4);
        assert_eq!(
            drain(&mut combiner),
            vec![
                (1, "first".to_string()),
                (0, "a".to_string()),
                (1, "b".to_string()),
                (2, "c".to_string()),
            ]
        );
        assert!(combiner.is_empty());
    }

    #[test]
    fn test_insertion_order_tie_break() {
        let config = MergeConfig::builder()
            .with_tie_break(TieBreak::InsertionOrder)
            .build();
        let mut combiner = MinHeapSlotCombiner::new(3, &config);
        combiner.push(2, LogEntry::at_millis(10, "c")).unwrap();
        combiner.push(0, LogEntry::at_millis(10, "a")).unwrap();
        combiner.push(1, LogEntry::at_millis(10, "b")).unwrap();
        assert_eq!(
            drain(&mut combiner),
            vec![(2, "c".to_string()), (0, "a".to_string()), (1, "b".to_string())]
        );
    }

    #[test]
    fn test_order_check_fail() {
        let config = MergeConfig::builder().with_order_check(OrderCheck::Fail).build();
        let mut combiner = MinHeapSlotCombiner::new(2, &config);
        combiner.push(1, LogEntry::at_millis(20, "late")).unwrap();
        combiner.pop().unwrap();
        let err = combiner.push(1, LogEntry::at_millis(10, "early")).unwrap_err();
        assert_eq!(err.stream_idx(), Some(1));
        assert!(matches!(
            err,
            MergeError::Source { ref source, .. } if matches!(**source, MergeError::OutOfOrder { .. })
        ));
        // other sources are tracked independently
        combiner.push(0, LogEntry::at_millis(10, "early")).unwrap();
    }

    #[test]
    fn test_order_check_warn_keeps_record() {
        let mut combiner = MinHeapSlotCombiner::new(1, &MergeConfig::default());
        combiner.push(0, LogEntry::at_millis(20, "late")).unwrap();
        combiner.pop().unwrap();
        combiner.push(0, LogEntry::at_millis(10, "early")).unwrap();
        assert_eq!(combiner.len(), 1);
    }

    /// Counts how often its key is extracted.
    struct Counted {
        at: i64,
        key_calls: Rc<Cell<usize>>,
    }

    impl SortedRecord for Counted {
        type Key = i64;

        fn key(&self) -> i64 {
            self.key_calls.set(self.key_calls.get() + 1);
            self.at
        }
    }

    #[test]
    fn test_key_extracted_once_per_push() {
        let key_calls = Rc::new(Cell::new(0));
        let config = MergeConfig::builder().with_order_check(OrderCheck::Fail).build();
        let mut combiner = MinHeapSlotCombiner::new(16, &config);
        for (idx, at) in [9, 3, 14, 1, 7, 7, 12, 0, 5, 11, 2, 8, 6, 13, 4, 10].iter().enumerate() {
            let record = Counted {
                at: *at,
                key_calls: key_calls.clone(),
            };
            combiner.push(idx, record).unwrap();
        }
        let mut popped = vec![];
        while let Some(slot) = combiner.pop() {
            popped.push(slot.into_record().at);
        }
        assert_eq!(popped, vec![0, 1, 2, 3, 4, 5, 6, 7, 7, 8, 9, 10, 11, 12, 13, 14]);
        assert_eq!(key_calls.get(), 16);
    }

    #[test]
    fn test_unknown_source_is_internal_error() {
        let mut combiner = MinHeapSlotCombiner::new(1, &MergeConfig::default());
        let err = combiner.push(3, LogEntry::at_millis(0, "x")).unwrap_err();
        assert!(matches!(err, MergeError::Internal(_)));
    }
}
