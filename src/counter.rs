use core::fmt;

use crate::sync::{AtomicUsize, Ordering};

/// A shared counter built on a single fetch-and-add.
///
/// Useful as a sanity check next to the structures in this crate, e.g. to count successful
/// pushes and pops across threads and compare the totals afterwards.
pub struct AtomicCounter {
    count: AtomicUsize,
}

impl AtomicCounter {
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }

    /// Add one and return the previous value.
    pub fn increment(&self) -> usize {
        self.add(1)
    }

    /// Add `amount`, wrapping on overflow, and return the previous value.
    pub fn add(&self, amount: usize) -> usize {
        self.count.fetch_add(amount, Ordering::AcqRel)
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for AtomicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCounter").field(&self.get()).finish()
    }
}
