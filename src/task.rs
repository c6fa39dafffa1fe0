use parking_lot::{Condvar, Mutex};
use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc, OnceLock,
    },
};

use crate::{
    node::{Cascade, Dependant, Outcome, Signal},
    TaskError,
};

static PUBLISHED: &str = "outcome should be stored before dependants are released";

/// Opaque identifier of a task, unique for the lifetime of the process.
///
/// IDs are handed out in submission order.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a task.
///
/// `Completed` and `Failed` are terminal; a task never leaves them.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum TaskState {
    /// Some prerequisites haven't finished yet.
    Pending,
    /// All prerequisites have completed; waiting for admission.
    Eligible,
    /// The accessor is executing.
    Running,
    /// The accessor returned; its result is stored.
    Completed,
    /// The accessor panicked, or a prerequisite failed.
    Failed,
}

impl TaskState {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Pending,
            1 => TaskState::Eligible,
            2 => TaskState::Running,
            3 => TaskState::Completed,
            _ => TaskState::Failed,
        }
    }
}

/// Result cell shared by a task's handles and the worker that runs it.
pub(crate) struct Completion<T> {
    id: TaskId,
    state: AtomicU8,
    outcome: OnceLock<Result<T, TaskError>>,
    /// `None` once the outcome has been published.
    dependants: Mutex<Option<Vec<Arc<dyn Dependant>>>>,
    finished: Condvar,
}

impl<T> Completion<T> {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            state: AtomicU8::new(TaskState::Pending as u8),
            outcome: OnceLock::new(),
            dependants: Mutex::new(Some(Vec::new())),
            finished: Condvar::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: TaskState) {
        debug_assert!(!self.state().is_terminal(), "task left a terminal state");
        self.state.store(state as u8, Ordering::Release);
    }

    /// Stores the outcome, wakes blocked waiters, and queues dependants for notification.
    pub fn finish(&self, outcome: Result<T, TaskError>, cascade: &mut Cascade) {
        let signal = match &outcome {
            Ok(_) => Ok(()),
            Err(error) => Err(error.clone()),
        };
        let state = if signal.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        let stored = self.outcome.set(outcome).is_ok();
        debug_assert!(stored, "task outcome written twice");
        self.set_state(state);
        let dependants = self.dependants.lock().take().unwrap_or_default();
        self.finished.notify_all();
        cascade.notify(dependants, &signal);
    }

    pub fn try_wait(&self) -> Option<&Result<T, TaskError>> {
        self.outcome.get()
    }

    pub fn wait(&self) -> &Result<T, TaskError> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        let mut dependants = self.dependants.lock();
        while dependants.is_some() {
            self.finished.wait(&mut dependants);
        }
        drop(dependants);
        self.outcome.get().expect(PUBLISHED)
    }
}

impl<T> Signal for Completion<T>
where
    T: Send + Sync,
{
    fn subscribe(&self, dependant: &Arc<dyn Dependant>) -> Option<Outcome> {
        let mut dependants = self.dependants.lock();
        match dependants.as_mut() {
            Some(dependants) => {
                dependants.push(Arc::clone(dependant));
                None
            }
            None => Some(match self.outcome.get().expect(PUBLISHED) {
                Ok(_) => Ok(()),
                Err(error) => Err(error.clone()),
            }),
        }
    }
}

/// Completion handle of an accessor submitted with
/// [`ThreadSafe::spawn()`](struct.ThreadSafe.html#method.spawn).
///
/// The handle can be cloned freely; all clones refer to the same result. Once the task is
/// finished its result never changes, so it can be retrieved any number of times, from any
/// number of threads.
///
/// A handle (or any collection of them, see [`Prerequisites`](trait.Prerequisites.html)) can
/// be passed to [`ThreadSafe::spawn_after()`](struct.ThreadSafe.html#method.spawn_after)
/// to delay another task until this one is finished.
pub struct Task<T> {
    pub(crate) completion: Arc<Completion<T>>,
}

impl<T> Task<T> {
    pub(crate) fn new(completion: Arc<Completion<T>>) -> Self {
        Self { completion }
    }

    pub fn id(&self) -> TaskId {
        self.completion.id()
    }

    /// Current lifecycle state; may be stale by the time it's inspected.
    pub fn state(&self) -> TaskState {
        self.completion.state()
    }

    /// Returns `true` if the task has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.completion.try_wait().is_some()
    }

    /// Blocks until the task is finished, then returns a reference to its result, or the
    /// failure that prevented it.
    ///
    /// Blocking inside an accessor on a result of a task that needs the same thread pool
    /// to run may deadlock; prefer passing the task as a prerequisite instead.
    pub fn wait(&self) -> Result<&T, TaskError> {
        self.completion.wait().as_ref().map_err(Clone::clone)
    }

    /// Returns the result if the task is finished, without blocking.
    pub fn try_wait(&self) -> Option<Result<&T, TaskError>> {
        self.completion
            .try_wait()
            .map(|outcome| outcome.as_ref().map_err(Clone::clone))
    }

    /// Blocks until the task is finished, then returns a clone of its result.
    pub fn get(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        self.wait().map(Clone::clone)
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            completion: Arc::clone(&self.completion),
        }
    }
}

impl<T> Debug for Task<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
