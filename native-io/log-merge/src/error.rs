use std::{error::Error, io, result};

use thiserror::Error;

/// Result type for operations that could result in a [MergeError]
pub type Result<T, E = MergeError> = result::Result<T, E>;

/// Error type for foreign failures carried through [MergeError::External]
pub type GenericError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MergeError {
    /// A source failed while being pulled. The merge is aborted and the printer is never completed.
    #[error("source {stream_idx} failed: {source}")]
    Source {
        stream_idx: usize,
        #[source]
        source: Box<MergeError>,
    },

    /// A record could not be decoded, so it has no usable key.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A key arrived lower than its predecessor.
    #[error("record out of order in {origin}: {current} after {previous}")]
    OutOfOrder {
        origin: String,
        previous: String,
        current: String,
    },

    #[error("printer error: {0}")]
    Printer(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Other error: {0}")]
    External(#[from] GenericError),

    #[error(
        "Internal error: {0}.\nThis was likely caused by a bug in log-merge's code \
        and we would welcome that you file a bug report in our issue tracker"
    )]
    Internal(String),
}

impl MergeError {
    /// Attributes this error to the source at `stream_idx`.
    ///
    /// Errors already attributed to a source are returned unchanged, so the innermost index wins.
    pub fn in_source(self, stream_idx: usize) -> Self {
        match self {
            e @ MergeError::Source { .. } => e,
            e => MergeError::Source {
                stream_idx,
                source: Box::new(e),
            },
        }
    }

    /// Index of the failing source, if this is a source failure.
    pub fn stream_idx(&self) -> Option<usize> {
        match self {
            MergeError::Source { stream_idx, .. } => Some(*stream_idx),
            _ => None,
        }
    }
}
