#![allow(dead_code)]

use lockfree_cas::{AtomicCounter, MsQueue, TaggedStack, TreiberStack};
use tracing::debug;

cfg_if::cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync::Arc;
        pub(crate) use loom::thread;
    } else if #[cfg(feature = "shuttle")] {
        pub(crate) use shuttle::sync::Arc;
        pub(crate) use shuttle::thread;
    } else if #[cfg(feature = "std")] {
        pub(crate) use std::sync::Arc;
        pub(crate) use std::thread;
    }
}

/// The values thread `thread_id` pushes or enqueues, in order.
pub(crate) fn values_of<const NUM_OPS: usize>(thread_id: usize) -> impl Iterator<Item = usize> {
    (NUM_OPS * thread_id)..(NUM_OPS * thread_id + NUM_OPS)
}

fn assert_every_value_seen_once<const NUM_THREADS: usize, const NUM_OPS: usize>(
    mut seen: Vec<usize>,
) {
    seen.sort_unstable();
    let expected: Vec<usize> = (0..NUM_THREADS * NUM_OPS).collect();
    assert_eq!(seen, expected);
}

/// Every thread alternates pushes and pops on one shared stack. No value may be lost or popped
/// twice, and the pop counter must agree with what the threads report.
pub(crate) fn stack_push_pop_test<const NUM_THREADS: usize, const NUM_OPS: usize>() {
    let stack: Arc<TreiberStack<usize>> = Arc::new(TreiberStack::new());
    let pops: Arc<AtomicCounter> = Arc::new(AtomicCounter::default());

    let join_handles: Vec<thread::JoinHandle<Vec<usize>>> = (0..NUM_THREADS)
        .map(|thread_id| {
            let stack: Arc<TreiberStack<usize>> = stack.clone();
            let pops: Arc<AtomicCounter> = pops.clone();
            thread::spawn(move || {
                let mut popped: Vec<usize> = Vec::new();
                for value in values_of::<NUM_OPS>(thread_id) {
                    stack.push(value);
                    if let Some(value) = stack.pop() {
                        pops.increment();
                        popped.push(value);
                    }
                }
                popped
            })
        })
        .collect();

    let mut seen: Vec<usize> = join_handles
        .into_iter()
        .flat_map(|join_handle| join_handle.join().expect("A thread panicked"))
        .collect();
    assert_eq!(seen.len(), pops.get());
    debug!(popped = seen.len(), "worker threads finished");

    while let Some(value) = stack.pop() {
        seen.push(value);
    }
    assert!(stack.is_empty());
    assert_every_value_seen_once::<NUM_THREADS, NUM_OPS>(seen);
}

/// Every thread pushes all of its values and only then starts popping. Whatever stays on the
/// stack afterwards must come off in reverse push order per thread.
pub(crate) fn stack_push_then_drain_test<const NUM_THREADS: usize, const NUM_OPS: usize>() {
    let stack: Arc<TreiberStack<usize>> = Arc::new(TreiberStack::new());

    let join_handles: Vec<thread::JoinHandle<()>> = (0..NUM_THREADS)
        .map(|thread_id| {
            let stack: Arc<TreiberStack<usize>> = stack.clone();
            thread::spawn(move || {
                for value in values_of::<NUM_OPS>(thread_id) {
                    stack.push(value);
                }
            })
        })
        .collect();
    join_handles
        .into_iter()
        .for_each(|join_handle| join_handle.join().expect("A thread panicked"));

    let mut last_seen: Vec<Option<usize>> = vec![None; NUM_THREADS];
    let mut seen: Vec<usize> = Vec::new();
    while let Some(value) = stack.pop() {
        let thread_id: usize = value / NUM_OPS;
        if let Some(previous) = last_seen[thread_id] {
            assert!(value < previous, "{value} popped after {previous}");
        }
        last_seen[thread_id] = Some(value);
        seen.push(value);
    }
    assert_every_value_seen_once::<NUM_THREADS, NUM_OPS>(seen);
}

/// Every thread enqueues its values in order and dequeues after each enqueue. Each consumer must
/// see every producer's values in increasing order, and nothing may be lost or duplicated.
pub(crate) fn queue_enqueue_dequeue_test<const NUM_THREADS: usize, const NUM_OPS: usize>() {
    let queue: Arc<MsQueue<usize>> = Arc::new(MsQueue::new());
    let dequeues: Arc<AtomicCounter> = Arc::new(AtomicCounter::default());

    let join_handles: Vec<thread::JoinHandle<Vec<usize>>> = (0..NUM_THREADS)
        .map(|thread_id| {
            let queue: Arc<MsQueue<usize>> = queue.clone();
            let dequeues: Arc<AtomicCounter> = dequeues.clone();
            thread::spawn(move || {
                let mut dequeued: Vec<usize> = Vec::new();
                for value in values_of::<NUM_OPS>(thread_id) {
                    queue.enqueue(value);
                    if let Some(value) = queue.dequeue() {
                        dequeues.increment();
                        dequeued.push(value);
                    }
                }
                dequeued
            })
        })
        .collect();

    let per_consumer: Vec<Vec<usize>> = join_handles
        .into_iter()
        .map(|join_handle| join_handle.join().expect("A thread panicked"))
        .collect();
    let mut remaining: Vec<usize> = Vec::new();
    while let Some(value) = queue.dequeue() {
        remaining.push(value);
    }
    assert!(queue.is_empty());

    let mut seen: Vec<usize> = Vec::new();
    for consumed in per_consumer.iter().chain(core::iter::once(&remaining)) {
        assert_producer_order_kept::<NUM_THREADS, NUM_OPS>(consumed);
        seen.extend_from_slice(consumed);
    }
    assert_eq!(seen.len() - remaining.len(), dequeues.get());
    assert_every_value_seen_once::<NUM_THREADS, NUM_OPS>(seen);
}

/// Every thread enqueues all of its values; draining afterwards must yield each thread's values
/// in exactly the order they were enqueued.
pub(crate) fn queue_enqueue_then_drain_test<const NUM_THREADS: usize, const NUM_OPS: usize>() {
    let queue: Arc<MsQueue<usize>> = Arc::new(MsQueue::new());

    let join_handles: Vec<thread::JoinHandle<()>> = (0..NUM_THREADS)
        .map(|thread_id| {
            let queue: Arc<MsQueue<usize>> = queue.clone();
            thread::spawn(move || {
                for value in values_of::<NUM_OPS>(thread_id) {
                    queue.enqueue(value);
                }
            })
        })
        .collect();
    join_handles
        .into_iter()
        .for_each(|join_handle| join_handle.join().expect("A thread panicked"));

    let mut seen: Vec<usize> = Vec::new();
    while let Some(value) = queue.dequeue() {
        seen.push(value);
    }
    assert_producer_order_kept::<NUM_THREADS, NUM_OPS>(&seen);
    assert_every_value_seen_once::<NUM_THREADS, NUM_OPS>(seen);
}

fn assert_producer_order_kept<const NUM_THREADS: usize, const NUM_OPS: usize>(
    consumed: &[usize],
) {
    let mut last_seen: Vec<Option<usize>> = vec![None; NUM_THREADS];
    for &value in consumed {
        let producer: usize = value / NUM_OPS;
        if let Some(previous) = last_seen[producer] {
            assert!(value > previous, "{value} dequeued after {previous}");
        }
        last_seen[producer] = Some(value);
    }
}

/// [stack_push_pop_test] against the tagged stack, where pops recycle nodes into later pushes.
pub(crate) fn tagged_stack_push_pop_test<const NUM_THREADS: usize, const NUM_OPS: usize>() {
    let stack: Arc<TaggedStack<usize>> = Arc::new(TaggedStack::new());

    let join_handles: Vec<thread::JoinHandle<Vec<usize>>> = (0..NUM_THREADS)
        .map(|thread_id| {
            let stack: Arc<TaggedStack<usize>> = stack.clone();
            thread::spawn(move || {
                let mut popped: Vec<usize> = Vec::new();
                for value in values_of::<NUM_OPS>(thread_id) {
                    stack.push(value);
                    if let Some(value) = stack.pop() {
                        popped.push(value);
                    }
                }
                popped
            })
        })
        .collect();

    let mut seen: Vec<usize> = join_handles
        .into_iter()
        .flat_map(|join_handle| join_handle.join().expect("A thread panicked"))
        .collect();
    while let Some(value) = stack.pop() {
        seen.push(value);
    }
    assert!(stack.is_empty());
    assert_every_value_seen_once::<NUM_THREADS, NUM_OPS>(seen);
}

/// One producer hands heap-allocated payloads to one consumer through a stack. Under loom, the
/// consumer reading a payload whose write is not ordered before the node became visible fails
/// the model.
pub(crate) fn stack_handoff_test<const NUM_OPS: usize>() {
    let stack: Arc<TreiberStack<Box<usize>>> = Arc::new(TreiberStack::new());

    let producer: thread::JoinHandle<()> = {
        let stack: Arc<TreiberStack<Box<usize>>> = stack.clone();
        thread::spawn(move || {
            for value in values_of::<NUM_OPS>(0) {
                stack.push(Box::new(value));
            }
        })
    };
    let consumer: thread::JoinHandle<Vec<usize>> = {
        let stack: Arc<TreiberStack<Box<usize>>> = stack.clone();
        thread::spawn(move || {
            (0..NUM_OPS)
                .filter_map(|_| stack.pop().map(|value| *value))
                .collect()
        })
    };

    producer.join().expect("A thread panicked");
    let mut seen: Vec<usize> = consumer.join().expect("A thread panicked");
    while let Some(value) = stack.pop() {
        seen.push(*value);
    }
    assert_every_value_seen_once::<1, NUM_OPS>(seen);
}

/// [stack_handoff_test] through a queue, where the consumer must also see the producer's order.
pub(crate) fn queue_handoff_test<const NUM_OPS: usize>() {
    let queue: Arc<MsQueue<Box<usize>>> = Arc::new(MsQueue::new());

    let producer: thread::JoinHandle<()> = {
        let queue: Arc<MsQueue<Box<usize>>> = queue.clone();
        thread::spawn(move || {
            for value in values_of::<NUM_OPS>(0) {
                queue.enqueue(Box::new(value));
            }
        })
    };
    let consumer: thread::JoinHandle<Vec<usize>> = {
        let queue: Arc<MsQueue<Box<usize>>> = queue.clone();
        thread::spawn(move || {
            (0..NUM_OPS)
                .filter_map(|_| queue.dequeue().map(|value| *value))
                .collect()
        })
    };

    producer.join().expect("A thread panicked");
    let mut seen: Vec<usize> = consumer.join().expect("A thread panicked");
    while let Some(value) = queue.dequeue() {
        seen.push(*value);
    }
    assert_producer_order_kept::<1, NUM_OPS>(&seen);
    assert_every_value_seen_once::<1, NUM_OPS>(seen);
}
