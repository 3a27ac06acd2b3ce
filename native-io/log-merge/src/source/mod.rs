//! Ready-made [`crate::merge_traits::LogSource`] and [`crate::merge_traits::AsyncLogSource`] implementations.

#[cfg(feature = "json")]
mod json_lines_source;
mod random_source;
mod stream_source;
mod vec_source;

#[cfg(feature = "json")]
pub use json_lines_source::{AsyncJsonLinesSource, JsonLinesSource, DEFAULT_MAX_LINE_LENGTH};
pub use random_source::RandomLogSource;
pub use stream_source::StreamSource;
pub use vec_source::VecSource;
