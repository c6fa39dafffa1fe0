use std::sync::Arc;

/// A unit of work handed over to a [`ThreadPool`](trait.ThreadPool.html).
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution substrate that runs admitted tasks.
///
/// Implemented for:
/// - `()`, which uses the global `rayon` thread pool,
/// - [`rayon::ThreadPool`](../rayon/struct.ThreadPool.html),
/// - `Arc` of any implementor, so a pool can be shared between several wrappers.
///
/// If the default `parallel` feature is disabled, `()` runs jobs inline, on the thread
/// whose call made the task admissible. Jobs handed over while another one is running
/// inline on the same thread are queued and run after it, in order.
///
/// Every job given to `execute()` must eventually run exactly once.
pub trait ThreadPool: Send + Sync + 'static {
    fn execute(&self, job: Job);
}

#[cfg(feature = "parallel")]
impl ThreadPool for () {
    fn execute(&self, job: Job) {
        rayon::spawn(job);
    }
}

#[cfg(feature = "parallel")]
impl ThreadPool for rayon::ThreadPool {
    fn execute(&self, job: Job) {
        self.spawn(job);
    }
}

#[cfg(not(feature = "parallel"))]
impl ThreadPool for () {
    fn execute(&self, job: Job) {
        inline::run(job);
    }
}

#[cfg(not(feature = "parallel"))]
mod inline {
    use std::{cell::RefCell, collections::VecDeque};

    use super::Job;

    thread_local! {
        /// `Some` while a job is running inline on this thread.
        static QUEUE: RefCell<Option<VecDeque<Job>>> = RefCell::new(None);
    }

    /// Clears the queue when the outermost job returns or unwinds, so that the thread
    /// doesn't keep queueing jobs nobody will run.
    struct Draining;

    impl Drop for Draining {
        fn drop(&mut self) {
            QUEUE.with(|queue| queue.borrow_mut().take());
        }
    }

    /// Runs `job`, unless a job is already running on this thread, in which case `job` is
    /// queued behind it. A job finishing often makes the next one admissible, so nesting
    /// them would grow the stack with the length of the gate's queue.
    pub fn run(job: Job) {
        let job = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            if let Some(pending) = queue.as_mut() {
                pending.push_back(job);
                return None;
            }
            *queue = Some(VecDeque::new());
            Some(job)
        });
        let mut next = match job {
            Some(job) => job,
            None => return,
        };
        let _draining = Draining;
        loop {
            next();
            let queued =
                QUEUE.with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front));
            match queued {
                Some(job) => next = job,
                None => break,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        };

        use parking_lot::Mutex;

        #[test]
        fn nested_jobs_run_after_current_one() {
            let order = Arc::new(Mutex::new(Vec::new()));
            let job: Job = {
                let order = Arc::clone(&order);
                Box::new(move || {
                    for index in 1..4 {
                        let order = Arc::clone(&order);
                        run(Box::new(move || order.lock().push(index)));
                    }
                    order.lock().push(0);
                })
            };
            run(job);
            assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
            assert!(QUEUE.with(|queue| queue.borrow().is_none()));
        }

        #[test]
        fn long_chain_of_jobs() {
            fn schedule(remaining: usize, ran: Arc<AtomicUsize>) {
                run(Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    if remaining > 1 {
                        schedule(remaining - 1, ran);
                    }
                }));
            }
            let ran = Arc::new(AtomicUsize::new(0));
            schedule(200_000, Arc::clone(&ran));
            assert_eq!(ran.load(Ordering::SeqCst), 200_000);
        }
    }
}

impl<Pool> ThreadPool for Arc<Pool>
where
    Pool: ThreadPool + ?Sized,
{
    fn execute(&self, job: Job) {
        Pool::execute(self, job);
    }
}
