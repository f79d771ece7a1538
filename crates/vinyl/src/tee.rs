//! Forks one [`ContentStream`] into two independently consumable streams.
//!
//! Both branches are fed by a single read of the source: whichever branch polls first pulls
//! the next chunk from the source, keeps it and queues a copy for its sibling. Chunks are
//! [`Bytes`], so the copy is a reference count bump, not a memcpy.
//!
//! The source is always polled with a [`FanoutWaker`], so readiness wakes every parked branch
//! and not only the one that polled last. A branch that is not read only grows its own queue;
//! it never stalls its sibling. A dropped branch stops receiving copies.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use futures::task::{ArcWake, waker_ref};
use futures::{Stream, StreamExt};
use tracing::trace;

use crate::contents::ContentStream;
use crate::error::ContentError;

type Chunk = Result<Bytes, ContentError>;

/// Splits `source` into two branches reading the same bytes.
pub fn tee(source: ContentStream) -> (ContentStream, ContentStream) {
    let shared = Arc::new(Mutex::new(Shared {
        source,
        exhausted: false,
        queues: [VecDeque::new(), VecDeque::new()],
        detached: [false, false],
        fanout: Arc::new(FanoutWaker::default()),
    }));

    let left = TeeBranch { shared: Arc::clone(&shared), index: 0 };
    let right = TeeBranch { shared, index: 1 };

    (ContentStream::new(left), ContentStream::new(right))
}

struct Shared {
    source: ContentStream,
    exhausted: bool,
    queues: [VecDeque<Chunk>; 2],
    detached: [bool; 2],
    fanout: Arc<FanoutWaker>,
}

/// Remembers the waker of each parked branch and wakes all of them at once.
#[derive(Default)]
struct FanoutWaker {
    wakers: Mutex<[Option<Waker>; 2]>,
}

impl FanoutWaker {
    fn wakers(&self) -> MutexGuard<'_, [Option<Waker>; 2]> {
        self.wakers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, index: usize, waker: &Waker) {
        let mut wakers = self.wakers();
        match &wakers[index] {
            Some(registered) if registered.will_wake(waker) => {}
            _ => wakers[index] = Some(waker.clone()),
        }
    }

    fn wake_branch(&self, index: usize) {
        let waker = self.wakers()[index].take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn forget(&self, index: usize) {
        self.wakers()[index] = None;
    }
}

impl ArcWake for FanoutWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let wakers = std::mem::take(&mut *arc_self.wakers());
        for waker in wakers.into_iter().flatten() {
            waker.wake();
        }
    }
}

struct TeeBranch {
    shared: Arc<Mutex<Shared>>,
    index: usize,
}

impl TeeBranch {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        // a panic while holding the lock can only come from the source stream itself,
        // the queues are still consistent
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Stream for TeeBranch {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let index = self.index;
        let sibling = 1 - index;
        let mut shared = self.lock();

        if let Some(chunk) = shared.queues[index].pop_front() {
            return Poll::Ready(Some(chunk));
        }

        if shared.exhausted {
            return Poll::Ready(None);
        }

        let fanout = Arc::clone(&shared.fanout);
        fanout.register(index, cx.waker());
        let waker = waker_ref(&fanout);
        let mut source_cx = Context::from_waker(&waker);

        match shared.source.poll_next_unpin(&mut source_cx) {
            Poll::Ready(Some(chunk)) => {
                fanout.forget(index);
                if !shared.detached[sibling] {
                    shared.queues[sibling].push_back(chunk.clone());
                }
                fanout.wake_branch(sibling);
                Poll::Ready(Some(chunk))
            }
            Poll::Ready(None) => {
                fanout.forget(index);
                shared.exhausted = true;
                fanout.wake_branch(sibling);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TeeBranch {
    fn drop(&mut self) {
        let index = self.index;
        let mut shared = self.lock();
        shared.detached[index] = true;
        shared.fanout.forget(index);

        let pending = shared.queues[index].len();
        if pending > 0 {
            trace!(index, pending, "tee branch dropped with unread chunks");
            shared.queues[index].clear();
        }
    }
}
