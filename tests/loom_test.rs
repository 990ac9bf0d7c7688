#![cfg(loom)]

mod common;

#[test]
fn two_thread_stack_loom_test() {
    loom::model(|| {
        common::stack_push_pop_test::<2, 1>();
    })
}

#[test]
fn two_thread_stack_drain_loom_test() {
    loom::model(|| {
        common::stack_push_then_drain_test::<2, 2>();
    })
}

#[test]
fn two_thread_queue_loom_test() {
    let mut builder: loom::model::Builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        common::queue_enqueue_dequeue_test::<2, 1>();
    })
}

#[test]
fn two_thread_queue_drain_loom_test() {
    let mut builder: loom::model::Builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        common::queue_enqueue_then_drain_test::<2, 2>();
    })
}

#[test]
fn two_thread_tagged_stack_loom_test() {
    loom::model(|| {
        common::tagged_stack_push_pop_test::<2, 1>();
    })
}

#[test]
fn stack_handoff_loom_test() {
    loom::model(|| {
        common::stack_handoff_test::<2>();
    })
}

#[test]
fn queue_handoff_loom_test() {
    let mut builder: loom::model::Builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        common::queue_handoff_test::<2>();
    })
}
