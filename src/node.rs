use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::debug;

use crate::{TaskError, TaskId};

/// What a finished prerequisite reports to its dependants.
pub type Outcome = Result<(), TaskError>;

/// Type-erased view of a task's completion, used as a dependency edge.
pub trait Signal: Send + Sync {
    /// Registers `dependant` to be notified once the task is finished; if it already is,
    /// returns its outcome instead.
    fn subscribe(&self, dependant: &Arc<dyn Dependant>) -> Option<Outcome>;
}

/// Something waiting on one or more prerequisites.
pub trait Dependant: Send + Sync {
    fn prerequisite_finished(&self, outcome: Outcome, cascade: &mut Cascade);
}

/// Notifications that still have to be delivered.
///
/// Failures travel along dependency edges through this queue rather than through recursion,
/// so arbitrarily long chains of dependants don't grow the stack.
#[derive(Default)]
pub struct Cascade {
    queue: VecDeque<(Arc<dyn Dependant>, Outcome)>,
}

impl Cascade {
    pub fn notify(&mut self, dependants: Vec<Arc<dyn Dependant>>, outcome: &Outcome) {
        self.queue
            .extend(dependants.into_iter().map(|dependant| (dependant, outcome.clone())));
    }

    /// Delivers queued notifications in the order they were queued, including any queued
    /// while delivering.
    pub fn run(mut self) {
        while let Some((dependant, outcome)) = self.queue.pop_front() {
            dependant.prerequisite_finished(outcome, &mut self);
        }
    }
}

/// Decision made once about a task whose prerequisites are settled.
pub enum Verdict {
    /// Every prerequisite completed; hand the task over to admission.
    Run,
    /// A prerequisite failed; the task fails with this error without running.
    Abort(TaskError),
}

pub type Launch = Box<dyn FnOnce(Verdict, &mut Cascade) + Send>;

/// Dependency tracking half of a submitted task.
///
/// Counts unsatisfied prerequisites and fires its launch closure exactly once: with
/// `Verdict::Run` when the last one completes, or with `Verdict::Abort` as soon as any
/// one fails.
pub struct Node {
    id: TaskId,
    unsatisfied: AtomicUsize,
    launch: Mutex<Option<Launch>>,
}

impl Node {
    /// Creates the node and subscribes it to all `prerequisites`.
    ///
    /// The node can fire before this returns, if the prerequisites are already finished.
    pub fn attach(
        id: TaskId,
        prerequisites: Vec<Arc<dyn Signal>>,
        launch: Launch,
        cascade: &mut Cascade,
    ) {
        // One extra count is held while subscribing, so that prerequisites finishing
        // concurrently can't launch the node before every edge is in place.
        let node = Arc::new(Node {
            id,
            unsatisfied: AtomicUsize::new(prerequisites.len() + 1),
            launch: Mutex::new(Some(launch)),
        });
        let dependant: Arc<dyn Dependant> = node.clone();
        for prerequisite in &prerequisites {
            if let Some(outcome) = prerequisite.subscribe(&dependant) {
                node.prerequisite_finished(outcome, cascade);
            }
        }
        node.prerequisite_finished(Ok(()), cascade);
    }

    fn fire(&self, verdict: Verdict, cascade: &mut Cascade) {
        let launch = self.launch.lock().take();
        if let Some(launch) = launch {
            launch(verdict, cascade);
        }
    }
}

impl Dependant for Node {
    fn prerequisite_finished(&self, outcome: Outcome, cascade: &mut Cascade) {
        match outcome {
            Ok(()) => {
                if self.unsatisfied.fetch_sub(1, Ordering::AcqRel) == 1 {
                    self.fire(Verdict::Run, cascade);
                }
            }
            Err(cause) => {
                debug!(task = %self.id, prerequisite = %cause.task_id(), "prerequisite failed");
                self.fire(
                    Verdict::Abort(TaskError::prerequisite_failed(self.id, cause)),
                    cascade,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Completion;

    #[derive(Debug, PartialEq)]
    enum Fired {
        Run,
        Abort(TaskError),
    }

    fn recording_launch(record: &Arc<Mutex<Vec<Fired>>>) -> Launch {
        let record = Arc::clone(record);
        Box::new(move |verdict: Verdict, _: &mut Cascade| {
            record.lock().push(match verdict {
                Verdict::Run => Fired::Run,
                Verdict::Abort(error) => Fired::Abort(error),
            })
        })
    }

    fn completion() -> Arc<Completion<()>> {
        Arc::new(Completion::new(TaskId::next()))
    }

    fn signals(completions: &[&Arc<Completion<()>>]) -> Vec<Arc<dyn Signal>> {
        completions
            .iter()
            .map(|completion| Arc::clone(completion) as Arc<dyn Signal>)
            .collect()
    }

    fn finish(completion: &Completion<()>, outcome: Result<(), TaskError>) {
        let mut cascade = Cascade::default();
        completion.finish(outcome, &mut cascade);
        cascade.run();
    }

    #[test]
    fn no_prerequisites() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let mut cascade = Cascade::default();
        Node::attach(TaskId::next(), vec![], recording_launch(&record), &mut cascade);
        cascade.run();
        assert_eq!(*record.lock(), vec![Fired::Run]);
    }

    #[test]
    fn prerequisites_several() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (completion(), completion(), completion());
        let mut cascade = Cascade::default();
        Node::attach(
            TaskId::next(),
            signals(&[&a, &b, &c]),
            recording_launch(&record),
            &mut cascade,
        );
        cascade.run();
        finish(&a, Ok(()));
        finish(&b, Ok(()));
        assert!(record.lock().is_empty());
        finish(&c, Ok(()));
        assert_eq!(*record.lock(), vec![Fired::Run]);
    }

    #[test]
    fn prerequisites_already_finished() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (completion(), completion());
        finish(&a, Ok(()));
        let mut cascade = Cascade::default();
        Node::attach(
            TaskId::next(),
            signals(&[&a, &b]),
            recording_launch(&record),
            &mut cascade,
        );
        cascade.run();
        assert!(record.lock().is_empty());
        finish(&b, Ok(()));
        assert_eq!(*record.lock(), vec![Fired::Run]);
    }

    #[test]
    fn failure_aborts_once() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (completion(), completion());
        let id = TaskId::next();
        let mut cascade = Cascade::default();
        Node::attach(id, signals(&[&a, &b]), recording_launch(&record), &mut cascade);
        cascade.run();
        let error = TaskError::panicked(a.id(), Box::new("boom"));
        finish(&a, Err(error.clone()));
        finish(&b, Err(TaskError::panicked(b.id(), Box::new("bang"))));
        assert_eq!(
            *record.lock(),
            vec![Fired::Abort(TaskError::prerequisite_failed(id, error))]
        );
    }

    #[test]
    fn duplicate_prerequisite_counts_twice() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let a = completion();
        let mut cascade = Cascade::default();
        Node::attach(
            TaskId::next(),
            signals(&[&a, &a]),
            recording_launch(&record),
            &mut cascade,
        );
        cascade.run();
        assert!(record.lock().is_empty());
        finish(&a, Ok(()));
        assert_eq!(*record.lock(), vec![Fired::Run]);
    }
}
