use alloc::boxed::Box;
use core::fmt;
use core::ptr;

use tracing::{debug, trace};

use super::Reclaim;
use crate::sync::{cas_retry_hint, AtomicPtr, AtomicUsize, Ordering};

/// A retired node whose type has been erased so nodes of any structure can share one list.
struct Retired {
    address: *mut u8,
    free: unsafe fn(*mut u8),
    next: *mut Retired,
}

unsafe fn free_erased<T>(address: *mut u8) {
    drop(Box::from_raw(address as *mut T));
}

/// Reclamation which never frees a node while the owning structure may be shared.
///
/// Retired nodes are pushed onto a lock-free list and stay allocated until
/// [Reclaim::quiesce] or `Drop`, both of which require exclusive access. No address is ever
/// reused while a stale reader could observe it, so this is always correct; the price is that
/// memory grows with the number of unlinks between quiescent points.
pub struct RetireList {
    head: AtomicPtr<Retired>,
    pending: AtomicUsize,
}

// SAFETY: the records are only ever reached through `head`, and only freed with `&mut self`.
unsafe impl Send for RetireList {}
unsafe impl Sync for RetireList {}

impl RetireList {
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            pending: AtomicUsize::new(0),
        }
    }

    /// The number of nodes retired since the last quiescent point.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for RetireList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Reclaim for RetireList {
    type Guard = ();

    fn pin(&self) {}

    unsafe fn retire<T>(&self, _guard: &(), node: *mut T) {
        let record: *mut Retired = Box::into_raw(Box::new(Retired {
            address: node as *mut u8,
            free: free_erased::<T>,
            next: ptr::null_mut(),
        }));

        loop {
            let head: *mut Retired = self.head.load(Ordering::Relaxed);
            (*record).next = head;
            if self
                .head
                .compare_exchange(head, record, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
            cas_retry_hint();
        }
        let pending: usize = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(node = ?node, pending, "retired node");
    }

    fn quiesce(&mut self) {
        let mut current: *mut Retired = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        let mut freed: usize = 0;
        while !current.is_null() {
            // SAFETY: `&mut self` means no other thread can be pushing or reading, and each
            // record was produced by `Box::into_raw` in `retire`.
            let record: Box<Retired> = unsafe { Box::from_raw(current) };
            unsafe { (record.free)(record.address) };
            current = record.next;
            freed += 1;
        }
        self.pending.store(0, Ordering::Release);
        if freed > 0 {
            debug!(freed, "freed retired nodes");
        }
    }
}

impl Drop for RetireList {
    fn drop(&mut self) {
        self.quiesce();
    }
}

impl fmt::Debug for RetireList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetireList")
            .field("pending", &self.pending())
            .finish()
    }
}
