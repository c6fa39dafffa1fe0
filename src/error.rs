use std::{
    any::Any,
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};

use crate::TaskId;

/// Failure stored in a [`Task`](struct.Task.html) instead of a result.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TaskError {
    /// The accessor of `task` panicked while running.
    Panicked { task: TaskId, message: Arc<str> },
    /// A prerequisite of `task` failed, so its accessor was never invoked.
    PrerequisiteFailed { task: TaskId, cause: Arc<TaskError> },
}

impl TaskError {
    pub(crate) fn panicked(task: TaskId, payload: Box<dyn Any + Send>) -> Self {
        let message: Arc<str> = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).into()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.as_str().into()
        } else {
            "Box<dyn Any>".into()
        };
        TaskError::Panicked { task, message }
    }

    pub(crate) fn prerequisite_failed(task: TaskId, cause: TaskError) -> Self {
        TaskError::PrerequisiteFailed {
            task,
            cause: Arc::new(cause),
        }
    }

    /// ID of the task this error is stored in.
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskError::Panicked { task, .. } | TaskError::PrerequisiteFailed { task, .. } => *task,
        }
    }

    /// Follows the chain of failed prerequisites down to the accessor that actually panicked.
    pub fn root_cause(&self) -> &TaskError {
        let mut error = self;
        while let TaskError::PrerequisiteFailed { cause, .. } = error {
            error = &**cause;
        }
        error
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskError::Panicked { task, message } => {
                write!(f, "accessor of task {} panicked: {}", task, message)
            }
            TaskError::PrerequisiteFailed { task, cause } => write!(
                f,
                "task {} was not run: prerequisite task {} failed",
                task,
                cause.task_id()
            ),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TaskError::Panicked { .. } => None,
            TaskError::PrerequisiteFailed { cause, .. } => Some(cause.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads() {
        let error = TaskError::panicked(TaskId(1), Box::new("static"));
        assert_eq!(error.to_string(), "accessor of task #1 panicked: static");
        let error = TaskError::panicked(TaskId(2), Box::new(String::from("owned")));
        assert_eq!(error.to_string(), "accessor of task #2 panicked: owned");
        let error = TaskError::panicked(TaskId(3), Box::new(42));
        assert_eq!(error.to_string(), "accessor of task #3 panicked: Box<dyn Any>");
    }

    #[test]
    fn cause_chain() {
        let root = TaskError::panicked(TaskId(0), Box::new("boom"));
        let middle = TaskError::prerequisite_failed(TaskId(1), root.clone());
        let leaf = TaskError::prerequisite_failed(TaskId(2), middle.clone());
        assert_eq!(leaf.task_id(), TaskId(2));
        assert_eq!(leaf.root_cause(), &root);
        assert_eq!(
            leaf.to_string(),
            "task #2 was not run: prerequisite task #1 failed"
        );
        let source = leaf.source().expect("should have a source");
        assert_eq!(source.to_string(), middle.to_string());
        assert!(root.source().is_none());
    }
}
