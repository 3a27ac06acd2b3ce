use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::Result;
use crate::merge_traits::{AsyncLogSource, LogSource, SortedRecord};

/// A source over records already held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource<R> {
    records: VecDeque<R>,
}

impl<R> VecSource<R> {
    pub fn new(records: Vec<R>) -> Self {
        VecSource {
            records: records.into(),
        }
    }

    /// Records not yet pulled.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl<R> FromIterator<R> for VecSource<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        VecSource {
            records: iter.into_iter().collect(),
        }
    }
}

impl<R: SortedRecord> LogSource for VecSource<R> {
    type Record = R;

    fn pop(&mut self) -> Result<Option<R>> {
        Ok(self.records.pop_front())
    }
}

#[async_trait]
impl<R: SortedRecord + Send> AsyncLogSource for VecSource<R> {
    type Record = R;

    async fn pop_async(&mut self) -> Result<Option<R>> {
        Ok(self.records.pop_front())
    }
}
