//! File payloads.
//!
//! A [`FileObject`](crate::FileObject) carries its payload in one of three modes,
//! modelled by [`Contents`]:
//!
//! - [`Contents::Null`]: no payload at all (directories, files only carrying metadata)
//! - [`Contents::Buffer`]: the whole payload, already in memory
//! - [`Contents::Stream`]: a lazy [`ContentStream`] that is only read when a consumer polls it
//!
//! A [`ContentStream`] has a single owner. Whoever needs a second reader must fork it with
//! [`Contents::fork`] (or [`tee`](crate::tee::tee) directly) instead of sharing the stream.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::buffered::BufferStream;
use crate::error::{ContentError, PluginError};
use crate::tee::tee;

/// The payload of a file object.
#[derive(Debug, Default)]
pub enum Contents {
    /// No payload
    #[default]
    Null,
    /// The complete payload in memory
    Buffer(Bytes),
    /// A lazily read payload
    Stream(ContentStream),
}

impl Contents {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Contents::Null)
    }

    #[inline]
    pub fn is_buffer(&self) -> bool {
        matches!(self, Contents::Buffer(_))
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        matches!(self, Contents::Stream(_))
    }

    /// Returns the in-memory payload if this is a buffer
    pub fn as_buffer(&self) -> Option<&Bytes> {
        match self {
            Contents::Buffer(bytes) => Some(bytes),
            Contents::Null | Contents::Stream(_) => None,
        }
    }

    /// Returns an independent copy of these contents.
    ///
    /// Buffers are copied by value (a cheap reference count bump for [`Bytes`]). A stream is
    /// forked into two tee branches: `self` keeps one and the other is returned, both reading
    /// the same source bytes.
    pub fn fork(&mut self) -> Contents {
        match self {
            Contents::Null => Contents::Null,
            Contents::Buffer(bytes) => Contents::Buffer(bytes.clone()),
            Contents::Stream(stream) => {
                let source = std::mem::replace(stream, ContentStream::empty());
                let (left, right) = tee(source);
                *stream = left;
                Contents::Stream(right)
            }
        }
    }

    /// Materializes the payload, draining it if it is a stream.
    pub async fn into_bytes(self) -> Result<Option<Bytes>, ContentError> {
        match self {
            Contents::Null => Ok(None),
            Contents::Buffer(bytes) => Ok(Some(bytes)),
            Contents::Stream(stream) => stream.collect_bytes().await.map(Some),
        }
    }
}

impl From<Bytes> for Contents {
    fn from(bytes: Bytes) -> Self {
        Contents::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Contents {
    fn from(vec: Vec<u8>) -> Self {
        Contents::Buffer(Bytes::from(vec))
    }
}

impl From<&'static [u8]> for Contents {
    fn from(slice: &'static [u8]) -> Self {
        Contents::Buffer(Bytes::from_static(slice))
    }
}

impl From<&'static str> for Contents {
    fn from(str: &'static str) -> Self {
        Contents::Buffer(Bytes::from_static(str.as_bytes()))
    }
}

impl From<ContentStream> for Contents {
    fn from(stream: ContentStream) -> Self {
        Contents::Stream(stream)
    }
}

impl From<Option<Bytes>> for Contents {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Contents::Buffer(bytes),
            None => Contents::Null,
        }
    }
}

/// A lazily read, single-owner byte stream.
pub struct ContentStream {
    inner: BoxStream<'static, Result<Bytes, ContentError>>,
}

impl ContentStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ContentError>> + Send + 'static,
    {
        Self { inner: stream.boxed() }
    }

    /// A stream that ends immediately.
    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// A stream yielding `bytes` as its only chunk.
    pub fn once(bytes: Bytes) -> Self {
        Self::new(stream::once(async move { Ok(bytes) }))
    }

    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(chunks).map(Ok))
    }

    /// Reads the payload from an async reader, chunk by chunk, as the stream is polled.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::new(ReaderStream::new(reader).map_err(ContentError::from))
    }

    /// Drains the stream into a single buffer.
    pub async fn collect_bytes(self) -> Result<Bytes, ContentError> {
        let mut buffer = BytesMut::new();
        let mut stream = self.inner;
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Pipes this stream through a [`BufferStream`], which collects every chunk and hands the
    /// whole payload to `callback` once the stream ends.
    pub fn buffered<F>(self, callback: F) -> ContentStream
    where
        F: FnOnce(Result<Bytes, ContentError>) -> Result<Bytes, PluginError> + Send + 'static,
    {
        ContentStream::new(BufferStream::new(self, callback))
    }
}

impl Stream for ContentStream {
    type Item = Result<Bytes, ContentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream").finish_non_exhaustive()
    }
}
