//! Lock-free concurrent containers built on single-word compare-and-swap.
//!
//! - [TreiberStack]: LIFO, one atomic head.
//! - [MsQueue]: FIFO, atomic head and tail around a permanent sentinel, with helping.
//! - [TaggedStack]: LIFO whose head packs a pointer and a version tag, so node addresses can be
//!   recycled without exposing the CAS to ABA.
//!
//! None of them frees a node at the moment it is unlinked. [TreiberStack] and [MsQueue] hand
//! unlinked nodes to a [Reclaim] strategy ([Epoch] by default with `std`, [RetireList]
//! otherwise); [TaggedStack] recycles them and frees only with exclusive access.
//!
//! ```
//! use lockfree_cas::{MsQueue, TreiberStack};
//!
//! let stack: TreiberStack<u32> = TreiberStack::new();
//! stack.push(1);
//! stack.push(2);
//! assert_eq!(stack.pop(), Some(2));
//!
//! let queue: MsQueue<u32> = MsQueue::new();
//! queue.enqueue(1);
//! queue.enqueue(2);
//! assert_eq!(queue.dequeue(), Some(1));
//! ```
//!
//! Build with `RUSTFLAGS="--cfg loom"` or `--features shuttle` to run the structures under a
//! model checker; see `tests/`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod err;
pub mod reclaim;

mod counter;
mod node;
mod queue;
mod stack;
mod sync;
#[cfg(target_has_atomic = "64")]
pub mod tagged;
#[cfg(target_has_atomic = "64")]
mod tagged_stack;
mod types;

pub use counter::AtomicCounter;
pub use queue::MsQueue;
#[cfg(all(feature = "std", not(loom), not(feature = "shuttle")))]
pub use reclaim::Epoch;
pub use reclaim::{DefaultReclaim, Reclaim, RetireList};
pub use stack::TreiberStack;
#[cfg(target_has_atomic = "64")]
pub use tagged::{AtomicTaggedPtr, TaggedPtr};
#[cfg(target_has_atomic = "64")]
pub use tagged_stack::TaggedStack;
pub use types::{Tag, ADDRESS_BIT_LENGTH, TAG_BIT_LENGTH, TAG_MASK};
