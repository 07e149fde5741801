//! Concurrent arming tests for `armory_core`.
//!
//! Arming is scoped to the current thread. These tests verify that scopes
//! on different threads never observe each other.

use std::sync::{Arc, Barrier, LazyLock};
use std::thread;

use armory_core::prelude::*;

#[derive(Resource)]
struct Worker {
    id: usize,
    weight: i64,
}

static WORKER: LazyLock<InstanceProvider<Worker>> = LazyLock::new(|| create_provider(false));

#[inject(WORKER)]
fn describe(#[injected] id: usize, #[injected] weight: i64) -> (usize, i64) {
    (id, weight)
}

/// Test that each thread sees its own payload while all are armed at once.
#[test]
fn threads_see_their_own_payloads() {
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|id| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let weight = i64::try_from(id).unwrap() * 10;
                let _armed = WORKER.arm(Worker { id, weight }).unwrap();

                // Every thread is armed past this point
                barrier.wait();

                for _ in 0..100 {
                    assert_eq!(describe(INJECTED, INJECTED).unwrap(), (id, weight));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

/// Test that arming on one thread leaves other threads unarmed.
#[test]
fn arming_does_not_leak_across_threads() {
    let armed_barrier = Arc::new(Barrier::new(2));
    let checked_barrier = Arc::new(Barrier::new(2));

    let holder = {
        let armed_barrier = Arc::clone(&armed_barrier);
        let checked_barrier = Arc::clone(&checked_barrier);
        thread::spawn(move || {
            let _armed = WORKER.arm(Worker { id: 1, weight: 1 }).unwrap();
            armed_barrier.wait();
            checked_barrier.wait();
            describe(INJECTED, INJECTED).unwrap()
        })
    };

    armed_barrier.wait();
    assert!(WORKER.provided().is_none());
    assert!(describe(INJECTED, INJECTED).is_err());

    // Arming here does not conflict with the other thread's scope
    let armed = WORKER.arm(Worker { id: 2, weight: 2 }).unwrap();
    assert_eq!(describe(INJECTED, INJECTED).unwrap(), (2, 2));
    drop(armed);
    checked_barrier.wait();

    assert_eq!(holder.join().expect("Thread panicked"), (1, 1));
}

/// Test that plans built on one thread are usable from others.
#[test]
fn plans_are_shared_between_threads() {
    // Builds the plan on this thread
    assert!(describe(1.into(), 2.into()).is_ok());

    let handles: Vec<_> = (0..3)
        .map(|id| {
            thread::spawn(move || {
                let _armed = WORKER.arm(Worker { id, weight: -1 }).unwrap();
                describe(INJECTED, INJECTED).unwrap()
            })
        })
        .collect();

    let mut seen: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked").0)
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
}

/// Test that a thread exiting with an armed scope does not disturb others.
#[test]
fn thread_exit_with_armed_scope() {
    thread::spawn(|| {
        let armed = WORKER.arm(Worker { id: 9, weight: 9 }).unwrap();
        core::mem::forget(armed);
    })
    .join()
    .expect("Thread panicked");

    let _armed = WORKER.arm(Worker { id: 3, weight: 3 }).unwrap();
    assert_eq!(describe(INJECTED, INJECTED).unwrap(), (3, 3));
}
