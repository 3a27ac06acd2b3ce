use std::fmt::Display;
use std::io::Write;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{MergeError, Result};
use crate::merge_config::OrderCheck;
use crate::merge_traits::{Printer, SortedRecord};

/// Writes one line per record.
///
/// Keys going backwards are handled according to the printer's [`OrderCheck`],
/// which defaults to [`OrderCheck::Warn`] like [`crate::MergeConfig`].
#[derive(Debug)]
pub struct WriterPrinter<W, R: SortedRecord> {
    writer: W,
    order_check: OrderCheck,
    last_key: Option<R::Key>,
    printed: usize,
    started: Option<Instant>,
    elapsed: Option<Duration>,
    _record: PhantomData<fn(R)>,
}

impl<W: Write, R: SortedRecord> WriterPrinter<W, R> {
    pub fn new(writer: W) -> Self {
        WriterPrinter {
            writer,
            order_check: OrderCheck::default(),
            last_key: None,
            printed: 0,
            started: None,
            elapsed: None,
            _record: PhantomData,
        }
    }

    pub fn with_order_check(mut self, order_check: OrderCheck) -> Self {
        self.order_check = order_check;
        self
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Time between the first print and `done`, once done.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W, R> Printer<R> for WriterPrinter<W, R>
where
    W: Write,
    R: SortedRecord + Display,
{
    fn print(&mut self, record: R) -> Result<()> {
        if self.order_check != OrderCheck::Off {
            let key = record.key();
            if let Some(last) = &self.last_key {
                if key < *last {
                    if self.order_check == OrderCheck::Fail {
                        return Err(MergeError::OutOfOrder {
                            origin: "printer".to_string(),
                            previous: format!("{:?}", last),
                            current: format!("{:?}", key),
                        });
                    }
                    warn!(previous = ?last, current = ?key, "printing a record out of order");
                }
            }
            self.last_key = Some(key);
        }
        self.started.get_or_insert_with(Instant::now);
        writeln!(self.writer, "{}", record).map_err(MergeError::Printer)?;
        self.printed += 1;
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        self.writer.flush().map_err(MergeError::Printer)?;
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        self.elapsed = Some(elapsed);
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { self.printed as f64 / secs } else { 0.0 };
        info!(
            printed = self.printed,
            elapsed_secs = secs,
            records_per_sec = rate,
            "printer done"
        );
        Ok(())
    }
}
