//! Safe concurrent access to a single resource that isn't synchronized internally,
//! under the "multiple readers or one writer" discipline, without ever touching a lock.
//!
//! A [`ThreadSafe`](struct.ThreadSafe.html) owns the resource and only lets it be reached
//! through accessors: closures or functions that take either `&R` or `&mut R`. The access
//! mode is inferred from that signature, so a reader can't accidentally write and a lock
//! can't be forgotten.
//!
//! Accessors can be ran either immediately on the calling thread with
//! [`ThreadSafe::sync()`](struct.ThreadSafe.html#method.sync), or as tasks on a
//! [`rayon`](../rayon/index.html) thread pool with
//! [`ThreadSafe::spawn()`](struct.ThreadSafe.html#method.spawn). Tasks return a
//! [`Task`](struct.Task.html) handle, which gives access to the result and can be used as
//! a prerequisite of other tasks, forming a dependency graph:
//! ```rust
//! use threadsafe::{TaskError, ThreadSafe};
//!
//! let numbers = ThreadSafe::new(vec![1, 2, 3]);
//!
//! let sum = numbers.spawn(|numbers: &Vec<i32>| numbers.iter().sum::<i32>());
//! let len = numbers.spawn(|numbers: &Vec<i32>| numbers.len());
//! let push = numbers.spawn_after(|numbers: &mut Vec<i32>| numbers.push(4), (&sum, &len));
//! let sum_after = numbers.spawn_after(|numbers: &Vec<i32>| numbers.iter().sum::<i32>(), &push);
//!
//! assert_eq!(threadsafe::results((&sum, &len, &sum_after)), (Ok(6), Ok(3), Ok(10)));
//!
//! // A task whose accessor panics fails, and so does everything that depends on it.
//! let broken = numbers.spawn(|_: &mut Vec<i32>| panic!("oops"));
//! let never = numbers.spawn_after(|numbers: &Vec<i32>| numbers.len(), &broken);
//! match never.get() {
//!     Err(TaskError::PrerequisiteFailed { cause, .. }) => {
//!         assert_eq!(cause.task_id(), broken.id());
//!     }
//!     _ => unreachable!(),
//! }
//!
//! // The wrapper is unaffected by failures.
//! assert_eq!(numbers.sync(|numbers: &Vec<i32>| numbers.len()), 4);
//! ```
//!
//! # Features
//! - `parallel` (default): tasks run on `rayon` thread pools. If disabled, tasks run inline,
//! on the thread whose call made them admissible, and `rayon` isn't pulled in.

#[macro_use]
mod macros;

mod access;
mod error;
mod gate;
mod node;
mod prerequisites;
mod results;
mod task;
mod thread_pool;
mod thread_safe;

pub use access::{Access, Accessor, Mut, Ref};
pub use error::TaskError;
pub use prerequisites::Prerequisites;
pub use results::{results, Results};
pub use task::{Task, TaskId, TaskState};
pub use thread_pool::{Job, ThreadPool};
pub use thread_safe::ThreadSafe;
