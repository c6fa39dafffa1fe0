#![cfg(not(feature = "parallel"))]

use crossbeam_channel::bounded;
use std::{sync::Arc, thread};

use threadsafe::{Task, ThreadSafe};

#[test]
fn long_writer_queue_drains_on_release() {
    let value = Arc::new(ThreadSafe::new(0u64));
    let (held_sender, held_receiver) = bounded(0);
    let (release_sender, release_receiver) = bounded::<()>(0);
    let holder = {
        let value = Arc::clone(&value);
        thread::spawn(move || {
            value.sync(|value: &mut u64| {
                held_sender.send(()).unwrap();
                release_receiver.recv().unwrap();
                *value += 1;
            })
        })
    };
    held_receiver.recv().unwrap();
    let tasks = (0..100_000)
        .map(|_| value.spawn(|value: &mut u64| *value += 1))
        .collect::<Vec<_>>();
    assert!(!tasks.iter().any(Task::is_finished));

    release_sender.send(()).unwrap();
    holder.join().unwrap();
    // Every queued writer ran inline on the releasing thread.
    assert!(tasks.iter().all(Task::is_finished));
    assert_eq!(value.sync(|value: &u64| *value), 100_001);
}

#[test]
fn long_dependency_chain_runs_inline() {
    let value = ThreadSafe::new(0u64);
    let mut last = value.spawn(|value: &mut u64| *value += 1);
    for _ in 0..100_000 {
        last = value.spawn_after(|value: &mut u64| *value += 1, &last);
    }
    assert_eq!(last.get(), Ok(()));
    assert_eq!(value.sync(|value: &u64| *value), 100_001);
}
