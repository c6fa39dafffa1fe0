use std::sync::Arc;

use crate::{node::Signal, Task};

/// Anything that can be passed to
/// [`ThreadSafe::spawn_after()`](struct.ThreadSafe.html#method.spawn_after) as the set
/// of tasks that must finish first.
///
/// Implemented for:
/// - `()` (no prerequisites),
/// - a single [`Task`](struct.Task.html), by value or by reference,
/// - slices, arrays, and `Vec`s of tasks,
/// - `Option` of any of these,
/// - any tuple (up to 12) of any of these, so that tasks with different result types
/// can be mixed.
///
/// The same task may appear more than once.
///
/// # Example
/// ```rust
/// # use threadsafe::ThreadSafe;
/// let value = ThreadSafe::new(1u64);
/// let reads = vec![
///     value.spawn(|value: &u64| *value),
///     value.spawn(|value: &u64| *value * 2),
/// ];
/// let label = value.spawn(|value: &u64| format!("{}", value));
/// let write = value.spawn_after(|value: &mut u64| *value = 0, (&reads, &label));
/// assert!(write.wait().is_ok());
/// assert_eq!(reads[1].get(), Ok(2));
/// ```
pub trait Prerequisites {
    #[doc(hidden)]
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>);
}

impl Prerequisites for () {
    fn collect_signals(self, _: &mut Vec<Arc<dyn Signal>>) {}
}

impl<T> Prerequisites for &'_ Task<T>
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        signals.push(self.completion.clone());
    }
}

impl<T> Prerequisites for Task<T>
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        signals.push(self.completion);
    }
}

impl<T> Prerequisites for &'_ [Task<T>]
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        for task in self {
            task.collect_signals(signals);
        }
    }
}

impl<T> Prerequisites for &'_ Vec<Task<T>>
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        self.as_slice().collect_signals(signals);
    }
}

impl<T> Prerequisites for Vec<Task<T>>
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        for task in self {
            task.collect_signals(signals);
        }
    }
}

impl<T, const N: usize> Prerequisites for &'_ [Task<T>; N]
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        self[..].collect_signals(signals);
    }
}

impl<T, const N: usize> Prerequisites for [Task<T>; N]
where
    T: Send + Sync + 'static,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        self[..].collect_signals(signals);
    }
}

impl<P> Prerequisites for Option<P>
where
    P: Prerequisites,
{
    fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
        if let Some(prerequisites) = self {
            prerequisites.collect_signals(signals);
        }
    }
}

macro_rules! impl_prerequisites_for_tuple {
    ($($letter:ident),*) => {
        paste::item! {
            impl<$($letter),*> Prerequisites for ($($letter,)*)
            where
                $($letter: Prerequisites,)*
            {
                fn collect_signals(self, signals: &mut Vec<Arc<dyn Signal>>) {
                    let ($([<prerequisite_ $letter:lower>],)*) = self;
                    $([<prerequisite_ $letter:lower>].collect_signals(signals);)*
                }
            }
        }
    };
}

impl_for_tuples!(impl_prerequisites_for_tuple);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{task::Completion, TaskId};

    fn task<T>() -> Task<T> {
        Task::new(Arc::new(Completion::new(TaskId::next())))
    }

    fn count(prerequisites: impl Prerequisites) -> usize {
        let mut signals = Vec::new();
        prerequisites.collect_signals(&mut signals);
        signals.len()
    }

    #[test]
    fn collections() {
        let tasks: Vec<Task<u8>> = vec![task(), task(), task()];
        assert_eq!(count(()), 0);
        assert_eq!(count(&tasks[0]), 1);
        assert_eq!(count(tasks[0].clone()), 1);
        assert_eq!(count(&tasks[..2]), 2);
        assert_eq!(count(&tasks), 3);
        assert_eq!(count(tasks.clone()), 3);
        assert_eq!(count([task::<u8>(), task()]), 2);
        assert_eq!(count(&[task::<u8>()]), 1);
        assert_eq!(count(None::<Task<u8>>), 0);
        assert_eq!(count(Some(&tasks)), 3);
    }

    #[test]
    fn tuples() {
        let numbers: Vec<Task<u8>> = vec![task(), task()];
        let text = task::<String>();
        assert_eq!(count((&text,)), 1);
        assert_eq!(count((&numbers, &text)), 3);
        assert_eq!(count((&numbers, &text, (&numbers[0], ()))), 4);
        assert_eq!(count((&text, &text)), 2);
    }
}
