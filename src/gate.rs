use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    fmt::{Debug, Formatter, Result as FmtResult},
};
use tracing::{debug, trace};

use crate::{thread_pool::Job, Access, TaskId, ThreadPool};

static DISCONNECTED: &str = "channel should not be disconnected at this point";

/// What happens when a waiting entry is admitted.
pub enum Grant {
    /// Hand the task over to the thread pool.
    Spawn(Job),
    /// Wake a thread blocked in `Gate::acquire()`.
    Wake(Sender<()>),
}

struct Waiting {
    access: Access,
    task: Option<TaskId>,
    grant: Grant,
}

/// Reader-writer admission bookkeeping.
///
/// Entries are admitted strictly in the order they were queued: a writer at the front of the
/// queue holds back everything behind it, including readers that could otherwise have joined
/// the currently running ones. This keeps writers from starving.
#[derive(Default)]
pub struct Admission {
    readers: usize,
    writer: bool,
    queue: VecDeque<Waiting>,
}

impl Admission {
    fn can_admit(&self, access: Access) -> bool {
        match access {
            Access::Read => !self.writer,
            Access::Write => !self.writer && self.readers == 0,
        }
    }

    fn admit(&mut self, access: Access) {
        match access {
            Access::Read => self.readers += 1,
            Access::Write => self.writer = true,
        }
        debug_assert!(!self.writer || self.readers == 0);
    }

    fn release(&mut self, access: Access) {
        match access {
            Access::Read => {
                debug_assert!(self.readers != 0, "unbalanced release");
                self.readers -= 1;
            }
            Access::Write => {
                debug_assert!(self.writer, "release of an absent writer");
                self.writer = false;
            }
        }
    }

    /// Admits the new entry right away if nothing is queued ahead of it and the policy
    /// allows it, otherwise queues it.
    fn offer(&mut self, waiting: Waiting, granted: &mut Vec<Grant>) {
        if self.queue.is_empty() && self.can_admit(waiting.access) {
            trace!(task = ?waiting.task, access = ?waiting.access, "admitted");
            self.admit(waiting.access);
            granted.push(waiting.grant);
        } else {
            debug!(
                task = ?waiting.task,
                access = ?waiting.access,
                readers = self.readers,
                writer = self.writer,
                queued = self.queue.len(),
                "queued"
            );
            self.queue.push_back(waiting);
        }
    }

    /// Admits queued entries from the front for as long as the policy allows.
    fn pump(&mut self, granted: &mut Vec<Grant>) {
        while let Some(front) = self.queue.front() {
            if !self.can_admit(front.access) {
                break;
            }
            if let Some(waiting) = self.queue.pop_front() {
                trace!(task = ?waiting.task, access = ?waiting.access, "admitted from queue");
                self.admit(waiting.access);
                granted.push(waiting.grant);
            }
        }
    }
}

/// Decides when tasks and blocking calls may touch the resource, enforcing
/// "many readers xor one writer".
///
/// Policy is re-evaluated whenever an entry is offered and whenever a running one releases
/// its access. Admitted jobs are handed to the thread pool only after the lock is dropped.
pub struct Gate {
    admission: Mutex<Admission>,
    thread_pool: Box<dyn ThreadPool>,
}

impl Gate {
    pub fn new(thread_pool: Box<dyn ThreadPool>) -> Self {
        Self {
            admission: Mutex::new(Admission::default()),
            thread_pool,
        }
    }

    /// Queues an eligible task; `job` is executed once the task is admitted, and must
    /// call `release()` when done.
    pub fn submit(&self, task: TaskId, access: Access, job: Job) {
        let mut granted = Vec::new();
        self.admission.lock().offer(
            Waiting {
                access,
                task: Some(task),
                grant: Grant::Spawn(job),
            },
            &mut granted,
        );
        self.dispatch(granted);
    }

    /// Blocks the calling thread until it's admitted with given access.
    pub fn acquire(&self, access: Access) {
        let receiver = {
            let mut admission = self.admission.lock();
            if admission.queue.is_empty() && admission.can_admit(access) {
                admission.admit(access);
                return;
            }
            let (sender, receiver) = crossbeam_channel::bounded(1);
            let mut granted = Vec::new();
            admission.offer(
                Waiting {
                    access,
                    task: None,
                    grant: Grant::Wake(sender),
                },
                &mut granted,
            );
            debug_assert!(granted.is_empty());
            receiver
        };
        receiver.recv().expect(DISCONNECTED);
    }

    pub fn release(&self, access: Access) {
        let mut granted = Vec::new();
        {
            let mut admission = self.admission.lock();
            admission.release(access);
            admission.pump(&mut granted);
        }
        self.dispatch(granted);
    }

    fn dispatch(&self, granted: Vec<Grant>) {
        for grant in granted {
            match grant {
                Grant::Spawn(job) => self.thread_pool.execute(job),
                Grant::Wake(sender) => sender.send(()).expect(DISCONNECTED),
            }
        }
    }
}

impl Debug for Gate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let admission = self.admission.lock();
        f.debug_struct("Gate")
            .field("readers", &admission.readers)
            .field("writer", &admission.writer)
            .field("queued", &admission.queue.len())
            .finish()
    }
}
