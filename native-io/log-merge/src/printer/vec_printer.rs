use crate::error::Result;
use crate::merge_traits::Printer;

/// Collects merged records in memory.
#[derive(Debug, Clone)]
pub struct VecPrinter<R> {
    records: Vec<R>,
    done_calls: usize,
}

impl<R> VecPrinter<R> {
    pub fn new() -> Self {
        VecPrinter {
            records: Vec::new(),
            done_calls: 0,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// How many times `done` was called.
    pub fn done_calls(&self) -> usize {
        self.done_calls
    }

    pub fn is_done(&self) -> bool {
        self.done_calls > 0
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R> Default for VecPrinter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Printer<R> for VecPrinter<R> {
    fn print(&mut self, record: R) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        self.done_calls += 1;
        Ok(())
    }
}
