use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;
use crate::merge_traits::{AsyncLogSource, SortedRecord};

/// Adapts any fallible record stream into an [`AsyncLogSource`].
///
/// The stream must already be ordered by key.
#[derive(Debug)]
pub struct StreamSource<St> {
    stream: St,
}

impl<St> StreamSource<St> {
    pub fn new(stream: St) -> Self {
        StreamSource { stream }
    }

    pub fn into_inner(self) -> St {
        self.stream
    }
}

impl<R> StreamSource<ReceiverStream<Result<R>>> {
    /// Creates a source fed through a bounded channel.
    ///
    /// The source is exhausted once every sender is dropped; a sent `Err`
    /// fails the merge.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<R>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, StreamSource::new(ReceiverStream::new(rx)))
    }
}

#[async_trait]
impl<St, R> AsyncLogSource for StreamSource<St>
where
    St: Stream<Item = Result<R>> + Unpin + Send,
    R: SortedRecord + Send,
{
    type Record = R;

    async fn pop_async(&mut self) -> Result<Option<R>> {
        self.stream.next().await.transpose()
    }
}
