//! Treiber's lock-free stack.
//!
//! R. K. Treiber. Systems Programming: Coping with Parallelism. IBM Research Report RJ 5118,
//! 1986.

use core::fmt;
use core::marker::PhantomData;
use core::ptr;

use tracing::{instrument, trace};

use crate::node::Node;
use crate::reclaim::{DefaultReclaim, Reclaim};
use crate::sync::{cas_retry_hint, AtomicPtr, Ordering};

/// A LIFO stack with a single atomic head, usable by any number of producers and consumers.
///
/// Unlinked nodes are handed to `R` instead of being freed, so a concurrent `pop` which read the
/// old head can still follow its `next` safely, and no address is reused while such a reader
/// exists (which also keeps the head CAS free from ABA).
pub struct TreiberStack<T, R: Reclaim = DefaultReclaim> {
    head: AtomicPtr<Node<T>>,
    reclaim: R,
    _marker: PhantomData<T>,
}

// Payloads move between threads but are never accessed by two threads at once.
unsafe impl<T: Send, R: Reclaim> Send for TreiberStack<T, R> {}
unsafe impl<T: Send, R: Reclaim> Sync for TreiberStack<T, R> {}

impl<T> TreiberStack<T> {
    /// Create an empty stack which reclaims nodes with [DefaultReclaim].
    pub fn new() -> Self {
        Self::with_reclaimer(DefaultReclaim::default())
    }
}

impl<T, R: Reclaim> TreiberStack<T, R> {
    /// Create an empty stack which hands unlinked nodes to `reclaim`. No node is allocated.
    pub fn with_reclaimer(reclaim: R) -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            reclaim,
            _marker: PhantomData,
        }
    }

    /// Push `value` on top of the stack.
    #[instrument(level = "trace", skip_all)]
    pub fn push(&self, value: T) {
        let node: *mut Node<T> = Node::allocate(value);

        loop {
            let head: *mut Node<T> = self.head.load(Ordering::Relaxed);
            // SAFETY: `node` has not been published yet, so we still own it exclusively.
            unsafe { Node::next(node) }.store(head, Ordering::Relaxed);

            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual_head) => {
                    trace!(expected = ?head, actual = ?actual_head, "head moved during push");
                    cas_retry_hint();
                }
            }
        }
    }

    /// Remove and return the top value, or `None` if the stack was empty when the head was read.
    #[instrument(level = "trace", skip_all)]
    pub fn pop(&self) -> Option<T> {
        let guard: R::Guard = self.reclaim.pin();

        loop {
            let head: *mut Node<T> = self.head.load(Ordering::Acquire);
            if head.is_null() {
                return None;
            }

            // SAFETY: `head` was loaded while pinned, so even if another thread has unlinked it
            // since, it has not been freed.
            let next: *mut Node<T> = unsafe { Node::next(head) }.load(Ordering::Acquire);

            match self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    // SAFETY: the CAS above unlinked `head` and only the thread which wins that
                    // CAS consumes its payload.
                    let value: T = unsafe { Node::take_value(head) };
                    // SAFETY: `head` is unreachable for new readers and is retired once, by us.
                    unsafe { self.reclaim.retire(&guard, head) };
                    return Some(value);
                }
                Err(actual_head) => {
                    trace!(expected = ?head, actual = ?actual_head, "head moved during pop");
                    cas_retry_hint();
                }
            }
        }
    }

    /// Whether the stack was empty at the moment of the call. The answer may be stale as soon as
    /// it is returned.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// The strategy unlinked nodes are handed to.
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

impl<T, R: Reclaim> Default for TreiberStack<T, R> {
    fn default() -> Self {
        Self::with_reclaimer(R::default())
    }
}

impl<T, R: Reclaim> Drop for TreiberStack<T, R> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T, R: Reclaim> Extend<T> for TreiberStack<T, R> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T, R: Reclaim> FromIterator<T> for TreiberStack<T, R> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stack: Self = Self::default();
        stack.extend(iter);
        stack
    }
}

impl<T, R: Reclaim + fmt::Debug> fmt::Debug for TreiberStack<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreiberStack")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("reclaim", &self.reclaim)
            .finish()
    }
}
