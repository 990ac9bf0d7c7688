//! A Treiber stack whose head is an [AtomicTaggedPtr], so node addresses can be reused safely.

use core::fmt;
use core::marker::PhantomData;

use tracing::{debug, instrument, trace};

use crate::node::Node;
use crate::sync::{cas_retry_hint, Ordering};
use crate::tagged::{AtomicTaggedPtr, TaggedPtr};

/// A LIFO stack which closes the ABA hazard with a version tag rather than with reclamation.
///
/// Popped nodes are not freed but recycled through a second tagged stack of empty nodes, and
/// later pushes reuse them, so the same address genuinely shows up on top of the stack again. A
/// thread which read the head before such a round trip holds the right address with an old tag,
/// and its CAS fails. See [crate::tagged] for how wide the tag is and what that guarantees.
///
/// Nodes are returned to the allocator only by [TaggedStack::quiesce] and `Drop`, both of which
/// have exclusive access, so a stale reader may always follow `next` of whatever address it
/// holds.
pub struct TaggedStack<T> {
    head: AtomicTaggedPtr<Node<T>>,
    /// Empty nodes waiting to be reused by `push`.
    free: AtomicTaggedPtr<Node<T>>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for TaggedStack<T> {}
unsafe impl<T: Send> Sync for TaggedStack<T> {}

/// Link `node`, which the caller owns exclusively, on top of `list`.
fn push_node<T>(list: &AtomicTaggedPtr<Node<T>>, node: *mut Node<T>) {
    loop {
        let current: TaggedPtr<Node<T>> = list.load(Ordering::Relaxed);
        // SAFETY: `node` is not reachable from `list` yet.
        unsafe { Node::next(node) }.store(current.as_ptr(), Ordering::Relaxed);

        match list.compare_exchange(
            current,
            current.successor(node),
            Ordering::Release,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(error) => {
                trace!(%error, "tagged head moved during push");
                cas_retry_hint();
            }
        }
    }
}

/// Unlink the top node of `list` and hand it to the caller exclusively.
fn pop_node<T>(list: &AtomicTaggedPtr<Node<T>>) -> Option<*mut Node<T>> {
    loop {
        let current: TaggedPtr<Node<T>> = list.load(Ordering::Acquire);
        if current.is_null() {
            return None;
        }

        // SAFETY: nodes are never freed while the stack is shared, so even if `current` was
        // popped and recycled since we loaded it, its `next` is still valid memory. A `next`
        // read from a recycled node is garbage, but then the tag has moved on and the CAS fails.
        let next: *mut Node<T> = unsafe { Node::next(current.as_ptr()) }.load(Ordering::Acquire);

        match list.compare_exchange(
            current,
            current.successor(next),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return Some(current.as_ptr()),
            Err(error) => {
                if error.is_stale_tag() {
                    debug!(%error, "rejected a stale head whose address was reused");
                } else {
                    trace!(%error, "tagged head moved during pop");
                }
                cas_retry_hint();
            }
        }
    }
}

impl<T> TaggedStack<T> {
    /// Create an empty stack. No node is allocated.
    pub fn new() -> Self {
        Self {
            head: AtomicTaggedPtr::null(),
            free: AtomicTaggedPtr::null(),
            _marker: PhantomData,
        }
    }

    /// Push `value` on top of the stack, reusing a recycled node if one is available.
    #[instrument(level = "trace", skip_all)]
    pub fn push(&self, value: T) {
        let node: *mut Node<T> = match pop_node(&self.free) {
            Some(recycled) => {
                // SAFETY: popping `recycled` off the free list made us its only owner, and its
                // previous payload was taken before it was put there.
                unsafe { Node::write_value(recycled, value) };
                recycled
            }
            None => Node::allocate(value),
        };
        push_node(&self.head, node);
    }

    /// Remove and return the top value, or `None` if the stack was empty when the head was read.
    #[instrument(level = "trace", skip_all)]
    pub fn pop(&self) -> Option<T> {
        let node: *mut Node<T> = pop_node(&self.head)?;
        // SAFETY: `pop_node` made us the only owner of `node`, which carries a payload because
        // everything on `head` was pushed by `push`.
        let value: T = unsafe { Node::take_value(node) };
        push_node(&self.free, node);
        Some(value)
    }

    /// Whether the stack was empty at the moment of the call. The answer may be stale as soon as
    /// it is returned.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Return every recycled node to the allocator. `&mut self` proves no stale reader exists.
    pub fn quiesce(&mut self) {
        let mut freed: usize = 0;
        while let Some(node) = pop_node(&self.free) {
            // SAFETY: exclusive access, and free-list nodes hold no payload.
            unsafe { Node::free(node) };
            freed += 1;
        }
        if freed > 0 {
            debug!(freed, "freed recycled nodes");
        }
    }
}

impl<T> Default for TaggedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TaggedStack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        self.quiesce();
    }
}

impl<T> Extend<T> for TaggedStack<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for TaggedStack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stack: Self = Self::new();
        stack.extend(iter);
        stack
    }
}

impl<T> fmt::Debug for TaggedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedStack")
            .field("head", &self.head)
            .field("free", &self.free)
            .finish()
    }
}
