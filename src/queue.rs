//! Michael-Scott lock-free queue.
//!
//! Michael and Scott. Simple, Fast, and Practical Non-Blocking and Blocking Concurrent Queue
//! Algorithms. PODC 1996. <http://dl.acm.org/citation.cfm?id=248106>

use core::fmt;
use core::marker::PhantomData;
use core::ptr;

use crossbeam_utils::CachePadded;
use tracing::{instrument, trace};

use crate::node::Node;
use crate::reclaim::{DefaultReclaim, Reclaim};
use crate::sync::{cas_retry_hint, AtomicPtr, Ordering};

/// A FIFO queue usable by any number of producers and consumers.
// A singly-linked list whose first node is a sentinel without a payload: the logical contents are
// the nodes after `head`. `tail` points at the last node or, while an enqueue is between linking
// its node and swinging `tail`, at the node just before it. Every thread which observes the lag
// swings `tail` itself, so a stalled enqueuer never blocks anybody.
pub struct MsQueue<T, R: Reclaim = DefaultReclaim> {
    head: CachePadded<AtomicPtr<Node<T>>>,
    tail: CachePadded<AtomicPtr<Node<T>>>,
    reclaim: R,
    _marker: PhantomData<T>,
}

// Any particular `T` is only ever accessed by the thread which enqueued it and then by the one
// which dequeued it.
unsafe impl<T: Send, R: Reclaim> Send for MsQueue<T, R> {}
unsafe impl<T: Send, R: Reclaim> Sync for MsQueue<T, R> {}

impl<T> MsQueue<T> {
    /// Create an empty queue which reclaims nodes with [DefaultReclaim].
    pub fn new() -> Self {
        Self::with_reclaimer(DefaultReclaim::default())
    }
}

impl<T, R: Reclaim> MsQueue<T, R> {
    /// Create an empty queue which hands unlinked sentinels to `reclaim`. Allocates the sentinel.
    pub fn with_reclaimer(reclaim: R) -> Self {
        let sentinel: *mut Node<T> = Node::allocate_empty();
        Self {
            head: CachePadded::new(AtomicPtr::new(sentinel)),
            tail: CachePadded::new(AtomicPtr::new(sentinel)),
            reclaim,
            _marker: PhantomData,
        }
    }

    /// Append `value` at the back of the queue.
    #[instrument(level = "trace", skip_all)]
    pub fn enqueue(&self, value: T) {
        let node: *mut Node<T> = Node::allocate(value);
        let _guard: R::Guard = self.reclaim.pin();

        loop {
            let tail: *mut Node<T> = self.tail.load(Ordering::Acquire);
            // SAFETY: `tail` was loaded while pinned, so it has not been freed.
            let tail_next: &AtomicPtr<Node<T>> = unsafe { Node::next(tail) };
            let next: *mut Node<T> = tail_next.load(Ordering::Acquire);

            if tail != self.tail.load(Ordering::Acquire) {
                // the snapshot of `tail` and its `next` is inconsistent
                cas_retry_hint();
                continue;
            }

            if !next.is_null() {
                trace!(tail = ?tail, next = ?next, "tail is lagging, swinging it forward");
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed);
                cas_retry_hint();
                continue;
            }

            if tail_next
                .compare_exchange(ptr::null_mut(), node, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                // best effort: whoever sees the lag first finishes this for us
                if self
                    .tail
                    .compare_exchange(tail, node, Ordering::Release, Ordering::Relaxed)
                    .is_err()
                {
                    trace!("tail was already swung past the new node by a helper");
                }
                return;
            }
            trace!(tail = ?tail, "another enqueue linked behind the tail first");
            cas_retry_hint();
        }
    }

    /// Remove and return the value at the front, or `None` if the queue was empty when the
    /// sentinel's `next` was read.
    #[instrument(level = "trace", skip_all)]
    pub fn dequeue(&self) -> Option<T> {
        let guard: R::Guard = self.reclaim.pin();

        loop {
            let head: *mut Node<T> = self.head.load(Ordering::Acquire);
            let tail: *mut Node<T> = self.tail.load(Ordering::Acquire);
            // SAFETY: `head` was loaded while pinned, so it has not been freed.
            let next: *mut Node<T> = unsafe { Node::next(head) }.load(Ordering::Acquire);

            if head != self.head.load(Ordering::Acquire) {
                cas_retry_hint();
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                trace!(tail = ?tail, next = ?next, "tail is lagging, swinging it forward");
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed);
                cas_retry_hint();
                continue;
            }

            if next.is_null() {
                // `head` moved between the loads; start over with a fresh snapshot
                cas_retry_hint();
                continue;
            }

            match self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    // SAFETY: `next` is now the sentinel. It was linked by `enqueue` with a
                    // payload, and only the thread which promoted it to sentinel consumes that
                    // payload. It cannot be freed before `guard` is dropped.
                    let value: T = unsafe { Node::take_value(next) };
                    // SAFETY: the old sentinel is unreachable for new readers, and is retired
                    // once, by the thread which unlinked it.
                    unsafe { self.reclaim.retire(&guard, head) };
                    return Some(value);
                }
                Err(actual_head) => {
                    trace!(expected = ?head, actual = ?actual_head, "head moved during dequeue");
                    cas_retry_hint();
                }
            }
        }
    }

    /// Whether the queue was empty at the moment of the call. The answer may be stale as soon as
    /// it is returned.
    pub fn is_empty(&self) -> bool {
        let _guard: R::Guard = self.reclaim.pin();
        let head: *mut Node<T> = self.head.load(Ordering::Acquire);
        // SAFETY: `head` was loaded while pinned.
        unsafe { Node::next(head) }.load(Ordering::Acquire).is_null()
    }

    /// The strategy unlinked sentinels are handed to.
    pub fn reclaimer(&self) -> &R {
        &self.reclaim
    }

    /// Hand the reclaimer a point at which no other thread is inside an operation, proven by
    /// `&mut self`. What happens then depends on `R`: [crate::RetireList] frees everything it
    /// holds, while [crate::Epoch] only flushes this thread's deferred nodes to the global
    /// collector, which frees them once the epoch has advanced far enough.
    pub fn quiesce(&mut self) {
        self.reclaim.quiesce();
    }
}

impl<T, R: Reclaim> Default for MsQueue<T, R> {
    fn default() -> Self {
        Self::with_reclaimer(R::default())
    }
}

impl<T, R: Reclaim> Drop for MsQueue<T, R> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}

        let sentinel: *mut Node<T> = self.head.load(Ordering::Relaxed);
        // SAFETY: `&mut self` proves nobody else can reach the sentinel, and its payload slot is
        // empty.
        unsafe { Node::free(sentinel) };
    }
}

impl<T, R: Reclaim> Extend<T> for MsQueue<T, R> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.enqueue(value);
        }
    }
}

impl<T, R: Reclaim> FromIterator<T> for MsQueue<T, R> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue: Self = Self::default();
        queue.extend(iter);
        queue
    }
}

impl<T, R: Reclaim + fmt::Debug> fmt::Debug for MsQueue<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsQueue")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("reclaim", &self.reclaim)
            .finish()
    }
}
