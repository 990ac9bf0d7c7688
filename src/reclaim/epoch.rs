use core::fmt;

use crossbeam_epoch::Guard;
use tracing::trace;

use super::Reclaim;

/// Epoch-based reclamation on top of the global `crossbeam-epoch` collector.
///
/// Pinning registers the thread in the current epoch. A retired node is freed only after the
/// global epoch has advanced twice past the epoch it was retired in, which can only happen once
/// every thread pinned at the time of the retirement has unpinned.
#[derive(Default, Clone, Copy)]
pub struct Epoch;

unsafe impl Reclaim for Epoch {
    type Guard = Guard;

    fn pin(&self) -> Guard {
        crossbeam_epoch::pin()
    }

    unsafe fn retire<T>(&self, guard: &Guard, node: *mut T) {
        trace!(node = ?node, "deferring destruction to a later epoch");
        guard.defer_unchecked(move || drop(alloc::boxed::Box::from_raw(node)));
    }

    fn quiesce(&mut self) {
        // pushes this thread's deferred bag to the global queue and tries to advance the epoch
        crossbeam_epoch::pin().flush();
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Epoch")
    }
}
