//! The contract every structure in this crate obeys before an unlinked node is freed.
//!
//! A node unlinked by a successful CAS can still be referenced by a thread which loaded the
//! pointer before the unlink and has not yet dereferenced it. Freeing the node at the unlink
//! would turn that later dereference into a use-after-free, and handing the address back to the
//! allocator opens the door to ABA. So structures never free a node they unlink. They
//!
//! 1. [Reclaim::pin] a guard before loading any shared pointer they intend to dereference, and
//!    hold it until they are done with everything they loaded, and
//! 2. [Reclaim::retire] each node they unlink, while still holding that guard.
//!
//! An implementation of [Reclaim] in turn promises that a retired node is not freed while any
//! guard which was pinned before the node was retired is still alive.

#[cfg(all(feature = "std", not(loom), not(feature = "shuttle")))]
mod epoch;
mod retire_list;

#[cfg(all(feature = "std", not(loom), not(feature = "shuttle")))]
pub use epoch::Epoch;
pub use retire_list::RetireList;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "std", not(loom), not(feature = "shuttle")))] {
        /// The strategy used by [crate::TreiberStack::new] and [crate::MsQueue::new].
        pub type DefaultReclaim = Epoch;
    } else {
        /// The strategy used by [crate::TreiberStack::new] and [crate::MsQueue::new].
        ///
        /// Epoch-based reclamation needs `std` and does not run under loom or shuttle, so those
        /// builds fall back to never freeing while the structure is shared.
        pub type DefaultReclaim = RetireList;
    }
}

/// A deferred-reclamation strategy.
///
/// # Safety
/// Implementors must not free a node handed to [Reclaim::retire] while any guard returned by
/// [Reclaim::pin] before that call is still alive. [Reclaim::quiesce] may free everything, since
/// `&mut self` proves nobody else holds a guard.
pub unsafe trait Reclaim: Default + Send + Sync {
    /// Held across every dereference of a shared node.
    type Guard;

    /// Announce that the current thread is about to read shared pointers.
    fn pin(&self) -> Self::Guard;

    /// Take responsibility for freeing `node`, which was allocated with `Box` and has just been
    /// unlinked.
    ///
    /// # Safety
    /// `node` must be unreachable from every shared pointer visible to new readers, must have
    /// been allocated by `Box`, must be retired exactly once, and dropping it must not touch
    /// anything which may be gone by the time it runs (nodes in this crate never drop their
    /// payload).
    unsafe fn retire<T>(&self, guard: &Self::Guard, node: *mut T);

    /// Called with exclusive access, when no other thread can hold a guard. Implementations free
    /// what they can at that point, or push it closer to being freed.
    fn quiesce(&mut self);
}
