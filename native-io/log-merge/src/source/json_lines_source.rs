use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::merge_traits::{AsyncLogSource, LogSource, SortedRecord};

/// Longest line the async source buffers before failing, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

fn parse_line<R: DeserializeOwned>(line: &str, line_no: usize) -> Result<Option<R>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| MergeError::MalformedRecord {
            line: line_no,
            reason: e.to_string(),
        })
}

/// Reads one JSON document per line from a blocking reader. Blank lines are skipped.
pub struct JsonLinesSource<R, B> {
    reader: B,
    buf: Vec<u8>,
    line_no: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R> JsonLinesSource<R, BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening json lines source");
        Ok(JsonLinesSource::new(BufReader::new(File::open(path)?)))
    }
}

impl<R, B: BufRead> JsonLinesSource<R, B> {
    pub fn new(reader: B) -> Self {
        JsonLinesSource {
            reader,
            buf: Vec::new(),
            line_no: 0,
            _record: PhantomData,
        }
    }
}

impl<R, B> LogSource for JsonLinesSource<R, B>
where
    R: SortedRecord + DeserializeOwned,
    B: BufRead,
{
    type Record = R;

    fn pop(&mut self) -> Result<Option<R>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = std::str::from_utf8(&self.buf).map_err(|e| MergeError::MalformedRecord {
                line: self.line_no,
                reason: e.to_string(),
            })?;
            if let Some(record) = parse_line(line, self.line_no)? {
                return Ok(Some(record));
            }
        }
    }
}

/// Reads one JSON document per line from a tokio reader. Blank lines are skipped.
///
/// Lines longer than the configured maximum are reported as malformed instead of
/// being buffered.
pub struct AsyncJsonLinesSource<R, A> {
    lines: FramedRead<A, LinesCodec>,
    line_no: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R> AsyncJsonLinesSource<R, tokio::fs::File> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening async json lines source");
        Ok(AsyncJsonLinesSource::new(tokio::fs::File::open(path).await?))
    }
}

impl<R, A: AsyncRead> AsyncJsonLinesSource<R, A> {
    pub fn new(reader: A) -> Self {
        Self::with_max_line_length(reader, DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(reader: A, max_line_length: usize) -> Self {
        AsyncJsonLinesSource {
            lines: FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length)),
            line_no: 0,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R, A> AsyncLogSource for AsyncJsonLinesSource<R, A>
where
    R: SortedRecord + DeserializeOwned + Send,
    A: AsyncRead + Unpin + Send,
{
    type Record = R;

    async fn pop_async(&mut self) -> Result<Option<R>> {
        while let Some(line) = self.lines.next().await {
            self.line_no += 1;
            let line = line.map_err(|e| match e {
                LinesCodecError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
                    MergeError::MalformedRecord {
                        line: self.line_no,
                        reason: e.to_string(),
                    }
                }
                LinesCodecError::Io(e) => MergeError::Io(e),
                e => MergeError::MalformedRecord {
                    line: self.line_no,
                    reason: e.to_string(),
                },
            })?;
            if let Some(record) = parse_line(&line, self.line_no)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
