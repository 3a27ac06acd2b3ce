use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;

/// A record that can take part in a sorted merge.
///
/// Only the key decides the merge order; two records with equal keys are
/// otherwise unrelated.
pub trait SortedRecord {
    type Key: Ord + Clone + Debug;

    fn key(&self) -> Self::Key;
}

/// A source of records in non-decreasing key order that can be pulled without blocking.
pub trait LogSource {
    type Record: SortedRecord;

    /// Returns the next record, or `None` once the source is exhausted.
    fn pop(&mut self) -> Result<Option<Self::Record>>;
}

/// A source of records in non-decreasing key order whose pulls may suspend.
#[async_trait]
pub trait AsyncLogSource: Send {
    type Record: SortedRecord + Send;

    /// Resolves to the next record, or `None` once the source is exhausted.
    async fn pop_async(&mut self) -> Result<Option<Self::Record>>;
}

/// Consumer of merged records.
///
/// `print` is called once per record in merged order. `done` is called exactly
/// once after the last record, also when nothing was printed, and never when
/// the merge failed.
pub trait Printer<R> {
    fn print(&mut self, record: R) -> Result<()>;

    fn done(&mut self) -> Result<()>;
}

impl<S: LogSource + ?Sized> LogSource for Box<S> {
    type Record = S::Record;

    fn pop(&mut self) -> Result<Option<Self::Record>> {
        (**self).pop()
    }
}

#[async_trait]
impl<S: AsyncLogSource + ?Sized> AsyncLogSource for Box<S> {
    type Record = S::Record;

    async fn pop_async(&mut self) -> Result<Option<Self::Record>> {
        (**self).pop_async().await
    }
}

impl<R, P: Printer<R> + ?Sized> Printer<R> for &mut P {
    fn print(&mut self, record: R) -> Result<()> {
        (**self).print(record)
    }

    fn done(&mut self) -> Result<()> {
        (**self).done()
    }
}
