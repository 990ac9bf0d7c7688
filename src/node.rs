//! The link nodes shared by every structure in this crate, and the rules for handling them.
//!
//! A node moves through four states:
//!
//! 1. **exclusive**: just allocated, reachable only through the raw pointer its allocator holds.
//!    Any field may be written.
//! 2. **shared**: published by a successful CAS into a head, tail or `next` word. From now on
//!    only `next` may be touched by anyone, and only atomically. The payload belongs to whichever
//!    thread wins the CAS which unlinks (stack) or promotes (queue) the node.
//! 3. **unlinked**: removed from the reachable set by a successful CAS. Threads which read the
//!    pointer before the unlink may still dereference `next`, so the node goes to a
//!    [crate::reclaim::Reclaim] strategy (or, in the tagged stack, a free list) instead of the
//!    allocator.
//! 4. **freed**: only once the reclaimer proves no such reader remains.
//!
//! Dropping a node never drops its payload. Payloads leave a node exactly once, through
//! [Node::take_value], and structures drain themselves through their own pop path.

use alloc::boxed::Box;
use core::mem::MaybeUninit;
use core::ptr;

use crate::sync::{AtomicPtr, UnsafeCell};

pub(crate) struct Node<T> {
    /// Uninitialized in a queue sentinel, in a node whose payload was taken, and in a node waiting
    /// on the tagged stack's free list.
    value: UnsafeCell<MaybeUninit<T>>,
    pub(crate) next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    /// Allocate a node holding `value` with an empty `next`.
    pub(crate) fn allocate(value: T) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value: UnsafeCell::new(MaybeUninit::new(value)),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Allocate a node which holds no payload.
    pub(crate) fn allocate_empty() -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Borrow the `next` word of a node which may be shared.
    ///
    /// # Safety
    /// `node` must be non-null and must not have been freed; a guard of the owning structure's
    /// reclaimer must be held for the lifetime of the returned reference.
    pub(crate) unsafe fn next<'a>(node: *const Node<T>) -> &'a AtomicPtr<Node<T>> {
        &*ptr::addr_of!((*node).next)
    }

    /// Move the payload out of a node.
    ///
    /// # Safety
    /// The payload must be initialized and the caller must be the unique winner of the CAS which
    /// made it the payload's consumer. The payload is left logically uninitialized.
    pub(crate) unsafe fn take_value(node: *const Node<T>) -> T {
        (*ptr::addr_of!((*node).value))
            .with(|slot: *const MaybeUninit<T>| slot.read().assume_init())
    }

    /// Store a payload into a node which is exclusively owned by the caller but may still be read
    /// (through `next` only) by stale threads.
    ///
    /// # Safety
    /// The caller must own the node exclusively, and the previous payload, if any, must have
    /// already been taken.
    pub(crate) unsafe fn write_value(node: *const Node<T>, value: T) {
        (*ptr::addr_of!((*node).value))
            .with_mut(|slot: *mut MaybeUninit<T>| slot.write(MaybeUninit::new(value)));
    }

    /// Return a node's memory to the allocator without touching its payload.
    ///
    /// # Safety
    /// `node` must come from [Node::allocate] or [Node::allocate_empty], must be unreachable by
    /// every other thread, and must not be freed twice.
    pub(crate) unsafe fn free(node: *mut Node<T>) {
        drop(Box::from_raw(node));
    }
}
