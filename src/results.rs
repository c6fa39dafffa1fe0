use crate::{Task, TaskError};

/// Collections of tasks whose results can be gathered at once with
/// [`threadsafe::results()`](fn.results.html).
///
/// Implemented for a single `&Task`, for slices, arrays, and `Vec`s of tasks (yielding a
/// `Vec` of results in the same order), and for any tuple (up to 12) of those (yielding a
/// tuple of their outputs).
pub trait Results {
    type Output;

    fn results(self) -> Self::Output;
}

impl<T> Results for &'_ Task<T>
where
    T: Clone,
{
    type Output = Result<T, TaskError>;

    fn results(self) -> Self::Output {
        self.get()
    }
}

impl<T> Results for &'_ [Task<T>]
where
    T: Clone,
{
    type Output = Vec<Result<T, TaskError>>;

    fn results(self) -> Self::Output {
        self.iter().map(Task::get).collect()
    }
}

impl<T> Results for &'_ Vec<Task<T>>
where
    T: Clone,
{
    type Output = Vec<Result<T, TaskError>>;

    fn results(self) -> Self::Output {
        self.as_slice().results()
    }
}

impl<T, const N: usize> Results for &'_ [Task<T>; N]
where
    T: Clone,
{
    type Output = Vec<Result<T, TaskError>>;

    fn results(self) -> Self::Output {
        self[..].results()
    }
}

macro_rules! impl_results_for_tuple {
    ($($letter:ident),*) => {
        paste::item! {
            impl<$($letter),*> Results for ($($letter,)*)
            where
                $($letter: Results,)*
            {
                type Output = ($($letter::Output,)*);

                fn results(self) -> Self::Output {
                    let ($([<tasks_ $letter:lower>],)*) = self;
                    ($([<tasks_ $letter:lower>].results(),)*)
                }
            }
        }
    };
}

impl_for_tuples!(impl_results_for_tuple);

/// Blocks until every given task is finished, then returns their results in the order
/// the tasks were given.
///
/// # Example
/// ```rust
/// # use threadsafe::ThreadSafe;
/// let value = ThreadSafe::new(0i32);
/// let read1 = value.spawn(|value: &i32| *value);
/// let read2 = value.spawn(|value: &i32| *value);
/// let write = value.spawn(|value: &mut i32| *value = 42);
///
/// let (reads, write) = threadsafe::results((&[read1, read2], &write));
/// assert_eq!(reads.len(), 2);
/// assert_eq!(write, Ok(()));
/// ```
pub fn results<Tasks>(tasks: Tasks) -> Tasks::Output
where
    Tasks: Results,
{
    tasks.results()
}
