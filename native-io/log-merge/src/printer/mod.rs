//! Ready-made [`crate::merge_traits::Printer`] implementations.

mod vec_printer;
mod writer_printer;

pub use vec_printer::VecPrinter;
pub use writer_printer::WriterPrinter;
