//! Transform stages.
//!
//! A stage is a node in a pipeline of [`FileObject`]s. It implements [`Transform`], receiving
//! one file at a time and handing zero or more files downstream through an [`Emitter`].
//!
//! Driving a stage is done by [`StageExt::through`], which wraps any stream of files into a
//! [`Through`] stream and returns the stage's error channel next to it:
//!
//! ```
//! use futures::{StreamExt, stream};
//! use micro_vinyl::{Contents, Emitter, FileObject, StageExt, Transform};
//!
//! struct Rename;
//!
//! impl Transform for Rename {
//!     fn transform(&mut self, mut file: FileObject, emitter: &mut Emitter) {
//!         file.replace_extension(".txt");
//!         emitter.push(file);
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let files = stream::iter(vec![FileObject::new("notes.md", Contents::Null)]);
//! let (output, _errors) = files.through(Rename);
//! let output: Vec<FileObject> = output.collect().await;
//! assert_eq!(output[0].path().to_str(), Some("notes.txt"));
//! # });
//! ```
//!
//! Errors emitted by a stage never interrupt the data channel: the stage keeps processing and
//! it is up to whoever holds [`StageErrors`] to log, abort or ignore them.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::channel::mpsc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use pin_project_lite::pin_project;
use tracing::{trace, warn};

use crate::error::PluginError;
use crate::file::FileObject;

/// A per-item pipeline stage.
pub trait Transform {
    /// Handles one file. Returning from this method marks the item as done; everything pushed
    /// to `emitter` so far is delivered downstream before the next file is dispatched.
    fn transform(&mut self, file: FileObject, emitter: &mut Emitter);

    /// Called once when the upstream signals end of input.
    fn flush(&mut self, _emitter: &mut Emitter) {}
}

/// The output side handed to a [`Transform`]: a data channel and a separate error channel.
#[derive(Debug)]
pub struct Emitter {
    pending: VecDeque<FileObject>,
    errors: mpsc::UnboundedSender<PluginError>,
}

impl Emitter {
    fn new(errors: mpsc::UnboundedSender<PluginError>) -> Self {
        Self { pending: VecDeque::new(), errors }
    }

    /// Hands a file downstream.
    pub fn push(&mut self, file: FileObject) {
        trace!(path = %file.path().display(), "push file");
        self.pending.push_back(file);
    }

    /// Reports an error without terminating the stage.
    pub fn emit_error(&mut self, error: PluginError) {
        if let Err(e) = self.errors.unbounded_send(error) {
            warn!(cause = %e.into_inner(), "stage error dropped, no one is listening to the error channel");
        }
    }

    fn pop(&mut self) -> Option<FileObject> {
        self.pending.pop_front()
    }
}

/// The error channel of a stage, yielding every [`PluginError`] it emitted.
///
/// It ends once the stage's [`Through`] stream has been dropped.
#[derive(Debug)]
pub struct StageErrors {
    receiver: mpsc::UnboundedReceiver<PluginError>,
}

impl Stream for StageErrors {
    type Item = PluginError;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

impl StageErrors {
    /// Returns every error emitted so far without waiting for more.
    pub fn drain(&mut self) -> Vec<PluginError> {
        let mut errors = Vec::new();
        while let Ok(error) = self.receiver.try_recv() {
            errors.push(error);
        }
        errors
    }
}

pin_project! {
    /// A stream of files that went through a [`Transform`].
    #[derive(Debug)]
    pub struct Through<S, T> {
        #[pin]
        upstream: S,
        stage: T,
        emitter: Emitter,
        ended: bool,
    }
}

impl<S, T> Stream for Through<S, T>
where
    S: Stream<Item = FileObject>,
    T: Transform,
{
    type Item = FileObject;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(file) = this.emitter.pop() {
                return Poll::Ready(Some(file));
            }

            if *this.ended {
                return Poll::Ready(None);
            }

            match ready!(this.upstream.as_mut().poll_next(cx)) {
                Some(file) => this.stage.transform(file, this.emitter),
                None => {
                    trace!("end of input, flushing stage");
                    *this.ended = true;
                    this.stage.flush(this.emitter);
                }
            }
        }
    }
}

pub trait StageExt: Stream<Item = FileObject> {
    /// Pipes every file of this stream through `stage`.
    fn through<T: Transform>(self, stage: T) -> (Through<Self, T>, StageErrors)
    where
        Self: Sized,
    {
        let (sender, receiver) = mpsc::unbounded();
        let through = Through { upstream: self, stage, emitter: Emitter::new(sender), ended: false };
        (through, StageErrors { receiver })
    }
}

impl<S: Stream<Item = FileObject>> StageExt for S {}

/// The writable end of a [`file_channel`].
#[derive(Debug)]
pub struct FileSender {
    sender: mpsc::Sender<FileObject>,
}

impl FileSender {
    /// Writes one file into the pipeline, waiting while the channel is full.
    pub async fn send(&mut self, file: FileObject) -> Result<(), mpsc::SendError> {
        self.sender.send(file).await
    }

    /// Signals end of input: the receiving stream ends once the buffered files are read.
    pub async fn end(mut self) -> Result<(), mpsc::SendError> {
        self.sender.close().await
    }
}

impl Sink<FileObject> for FileSender {
    type Error = mpsc::SendError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().sender.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: FileObject) -> Result<(), Self::Error> {
        self.get_mut().sender.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().sender.poll_flush_unpin(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().sender.poll_close_unpin(cx)
    }
}

/// Creates a bounded channel to feed files into a pipeline by hand.
pub fn file_channel(buffer: usize) -> (FileSender, impl Stream<Item = FileObject>) {
    let (sender, receiver) = mpsc::channel(buffer);
    (FileSender { sender }, receiver)
}
