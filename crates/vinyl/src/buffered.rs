//! Adapts a whole-buffer transformation to a streamed payload.
//!
//! Some transformations (font codecs, image optimizers, ...) only work on complete buffers.
//! [`BufferStream`] collects its source until the end, calls the transformation exactly once
//! and yields the result as a single chunk.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;
use tracing::trace;

use crate::error::{ContentError, PluginError};

pin_project! {
    /// A stream that buffers its whole source before handing it to a callback.
    ///
    /// The callback receives `Ok(payload)` once the source ends, or the source's error if
    /// reading failed. Whatever it returns is the only item this stream yields.
    pub struct BufferStream<S, F> {
        #[pin]
        source: S,
        buffer: BytesMut,
        callback: Option<F>,
    }
}

impl<S, F> BufferStream<S, F>
where
    S: Stream<Item = Result<Bytes, ContentError>>,
    F: FnOnce(Result<Bytes, ContentError>) -> Result<Bytes, PluginError>,
{
    pub fn new(source: S, callback: F) -> Self {
        Self { source, buffer: BytesMut::new(), callback: Some(callback) }
    }
}

impl<S, F> Stream for BufferStream<S, F>
where
    S: Stream<Item = Result<Bytes, ContentError>>,
    F: FnOnce(Result<Bytes, ContentError>) -> Result<Bytes, PluginError>,
{
    type Item = Result<Bytes, ContentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if this.callback.is_none() {
            return Poll::Ready(None);
        }

        loop {
            let outcome = match ready!(this.source.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.buffer.extend_from_slice(&chunk);
                    continue;
                }
                Some(Err(e)) => Err(e),
                None => {
                    trace!(size = this.buffer.len(), "source drained, invoking buffer callback");
                    Ok(this.buffer.split().freeze())
                }
            };

            // the callback is only taken here, after which the stream is terminated
            let Some(callback) = this.callback.take() else {
                return Poll::Ready(None);
            };
            return Poll::Ready(Some(callback(outcome).map_err(ContentError::from)));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.callback.is_some() { (1, Some(1)) } else { (0, Some(0)) }
    }
}

impl<S, F> fmt::Debug for BufferStream<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferStream").field("buffered", &self.buffer.len()).field("done", &self.callback.is_none()).finish_non_exhaustive()
    }
}
