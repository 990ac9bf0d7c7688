//! A module which decides which synchronization primitives to use throughout the rest of the crate
//! depending on features and configuration options

cfg_if::cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::cell::UnsafeCell;
        pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
        #[cfg(target_has_atomic = "64")]
        pub(crate) use loom::sync::atomic::AtomicU64;
    } else if #[cfg(feature = "shuttle")] {
        pub(crate) use self::cell::UnsafeCell;
        pub(crate) use shuttle::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
        #[cfg(target_has_atomic = "64")]
        pub(crate) use shuttle::sync::atomic::AtomicU64;
    } else {
        pub(crate) use self::cell::UnsafeCell;
        pub(crate) use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
        #[cfg(target_has_atomic = "64")]
        pub(crate) use core::sync::atomic::AtomicU64;
    }
}

#[cfg(not(loom))]
mod cell {
    /// `core::cell::UnsafeCell` behind the closure-based API of `loom::cell::UnsafeCell`, so
    /// that loom can track every access to a node's payload and flag one which is not ordered
    /// after the write that published it.
    #[repr(transparent)]
    pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        #[inline]
        pub(crate) const fn new(data: T) -> UnsafeCell<T> {
            UnsafeCell(core::cell::UnsafeCell::new(data))
        }

        #[inline]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}

/// Called after every failed CAS before the retry re-reads shared state.
///
/// The model checkers need an explicit yield here, otherwise they keep scheduling the thread
/// which is spinning and never explore the interleaving in which its competitor finishes.
#[inline]
pub(crate) fn cas_retry_hint() {
    cfg_if::cfg_if! {
        if #[cfg(loom)] {
            loom::thread::yield_now();
        } else if #[cfg(feature = "shuttle")] {
            shuttle::thread::yield_now();
        } else {
            core::hint::spin_loop();
        }
    }
}
