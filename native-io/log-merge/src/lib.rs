pub mod error;
pub mod log_entry;
pub mod merge_config;
pub mod merge_traits;
pub mod min_heap;
pub mod min_heap_combiner;
pub mod printer;
pub mod sorted_merger;
pub mod sorted_stream_merger;
pub mod source;

pub use error::{MergeError, Result};
pub use log_entry::LogEntry;
pub use merge_config::{MergeConfig, MergeConfigBuilder, OrderCheck, TieBreak};
pub use merge_traits::{AsyncLogSource, LogSource, Printer, SortedRecord};
pub use sorted_merger::{merge_sorted, MergeSummary, SortedMerger};
pub use sorted_stream_merger::{merge_sorted_async, AsyncSortedMerger};
