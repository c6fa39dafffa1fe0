use std::{
    cell::UnsafeCell,
    fmt::{Debug, Formatter, Result as FmtResult},
    panic::{self, AssertUnwindSafe},
    ptr::NonNull,
    sync::Arc,
};
use tracing::{trace, warn};

use crate::{
    gate::Gate,
    node::{Cascade, Launch, Node, Verdict},
    task::Completion,
    Access, Accessor, Prerequisites, Task, TaskError, TaskId, TaskState, ThreadPool,
};

/// The resource together with the gate that guards it; shared by the wrapper and every
/// task that may still touch the resource.
struct Shared<R> {
    resource: UnsafeCell<R>,
    gate: Gate,
}

// The gate hands out either one `&mut R` or any number of `&R`, possibly on different threads.
unsafe impl<R> Send for Shared<R> where R: Send {}

unsafe impl<R> Sync for Shared<R> where R: Send + Sync {}

impl<R> Shared<R> {
    fn resource(&self) -> NonNull<R> {
        // `UnsafeCell::get()` never returns null.
        unsafe { NonNull::new_unchecked(self.resource.get()) }
    }
}

/// Releases admission when dropped, including while unwinding out of a panicking accessor.
struct Admitted<'gate> {
    gate: &'gate Gate,
    access: Access,
}

impl<'gate> Admitted<'gate> {
    fn acquire(gate: &'gate Gate, access: Access) -> Self {
        gate.acquire(access);
        Self { gate, access }
    }
}

impl Drop for Admitted<'_> {
    fn drop(&mut self) {
        self.gate.release(self.access);
    }
}

/// A wrapper over a resource that isn't synchronized internally, which makes it safe to
/// access from many threads at once.
///
/// The only way to reach the resource is to hand the wrapper an accessor: a closure or
/// a function that takes either `&R` (a reader) or `&mut R` (a writer). The access mode
/// is read from the accessor's signature, so there is no lock to forget to take, nor to
/// take the wrong kind of. Any number of readers may run at the same time, writers run
/// alone.
///
/// Accessors can be ran in two ways:
/// - [`::sync()`](#method.sync) blocks until the accessor may run, runs it on the calling
/// thread, and returns its result; this is what using a reader-writer lock would look like.
/// - [`::spawn()`](#method.spawn) and [`::spawn_after()`](#method.spawn_after) return
/// a [`Task`](struct.Task.html) immediately; the accessor runs on the thread pool once
/// its prerequisites are finished and the reader-writer policy admits it.
///
/// Both ways compete for the same queue: an accessor that has to wait is admitted in
/// the order it started waiting, and a waiting writer holds back every reader that
/// arrived after it.
///
/// # Example
/// ```rust
/// use threadsafe::ThreadSafe;
///
/// struct Resource {
///     value: i32,
/// }
///
/// impl Resource {
///     fn read(&self) -> i32 {
///         self.value
///     }
///
///     fn write(&mut self, value: i32) {
///         self.value = value;
///     }
/// }
///
/// let resource = ThreadSafe::new(Resource { value: 0 });
///
/// let value = resource.sync(|resource: &Resource| resource.read());
/// assert_eq!(value, 0);
///
/// // Readers take `&Resource` and may run concurrently.
/// let read1 = resource.spawn(|resource: &Resource| resource.read());
/// let read2 = resource.spawn(|resource: &Resource| resource.read());
///
/// // Writers take `&mut Resource` and run exclusively.
/// let write = resource.spawn(|resource: &mut Resource| resource.write(42));
///
/// let read3 = resource.spawn_after(|resource: &Resource| resource.read(), &write);
///
/// let (reads, write) = threadsafe::results((&[read1, read2], &write));
/// assert_eq!(reads, vec![Ok(0), Ok(0)]);
/// assert_eq!(write, Ok(()));
/// assert_eq!(read3.get(), Ok(42));
/// ```
pub struct ThreadSafe<R> {
    shared: Arc<Shared<R>>,
}

impl<R> ThreadSafe<R>
where
    R: Send + Sync + 'static,
{
    /// Wraps `resource`; tasks will run on the global `rayon` thread pool.
    pub fn new(resource: R) -> Self {
        Self::with_thread_pool(resource, ())
    }

    /// Wraps `resource`; tasks will run on the given thread pool.
    ///
    /// # Example
    /// ```rust
    /// # use threadsafe::ThreadSafe;
    /// # #[cfg(feature = "parallel")]
    /// # {
    /// let thread_pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    /// let value = ThreadSafe::with_thread_pool(0usize, thread_pool);
    /// let task = value.spawn(|value: &mut usize| *value += 1);
    /// assert!(task.wait().is_ok());
    /// # }
    /// ```
    pub fn with_thread_pool<Pool>(resource: R, thread_pool: Pool) -> Self
    where
        Pool: ThreadPool,
    {
        Self {
            shared: Arc::new(Shared {
                resource: UnsafeCell::new(resource),
                gate: Gate::new(Box::new(thread_pool)),
            }),
        }
    }

    /// Runs the accessor on the calling thread as soon as the reader-writer policy allows,
    /// and returns its result.
    ///
    /// Equivalent to `self.spawn(accessor).get()`, minus the trip through the thread pool.
    ///
    /// # Panics
    /// A panic inside the accessor is propagated to the caller; the wrapper stays usable.
    ///
    /// Calling this from inside an accessor running on the same wrapper deadlocks,
    /// the same way re-locking a reader-writer lock would.
    pub fn sync<A, Marker>(&self, accessor: A) -> A::Output
    where
        A: Accessor<R, Marker>,
    {
        let _admitted = Admitted::acquire(&self.shared.gate, A::ACCESS);
        unsafe { accessor.invoke(self.shared.resource()) }
    }

    /// Schedules the accessor to run on the thread pool and returns its completion handle,
    /// without blocking.
    pub fn spawn<A, Marker>(&self, accessor: A) -> Task<A::Output>
    where
        A: Accessor<R, Marker> + Send + 'static,
        A::Output: Send + Sync + 'static,
    {
        self.spawn_after(accessor, ())
    }

    /// Schedules the accessor to run on the thread pool once all `prerequisites` are
    /// finished, and returns its completion handle, without blocking.
    ///
    /// Prerequisites can be tasks of any wrapper, not just this one. If any of them fails,
    /// the accessor is never invoked and the returned task fails with
    /// [`TaskError::PrerequisiteFailed`](enum.TaskError.html#variant.PrerequisiteFailed).
    ///
    /// See [`Prerequisites`](trait.Prerequisites.html) for what can be passed in.
    pub fn spawn_after<A, Marker, P>(&self, accessor: A, prerequisites: P) -> Task<A::Output>
    where
        A: Accessor<R, Marker> + Send + 'static,
        A::Output: Send + Sync + 'static,
        P: Prerequisites,
    {
        let id = TaskId::next();
        let access = A::ACCESS;
        let completion = Arc::new(Completion::new(id));
        let mut signals = Vec::new();
        prerequisites.collect_signals(&mut signals);
        trace!(task = %id, ?access, prerequisites = signals.len(), "submitted");
        let launch: Launch = {
            let shared = Arc::clone(&self.shared);
            let completion = Arc::clone(&completion);
            Box::new(move |verdict: Verdict, cascade: &mut Cascade| match verdict {
                Verdict::Run => {
                    completion.set_state(TaskState::Eligible);
                    let job_shared = Arc::clone(&shared);
                    let job = move || execute::<R, A, Marker>(job_shared, completion, accessor);
                    shared.gate.submit(id, access, Box::new(job));
                }
                Verdict::Abort(error) => completion.finish(Err(error), cascade),
            })
        };
        let mut cascade = Cascade::default();
        Node::attach(id, signals, launch, &mut cascade);
        cascade.run();
        Task::new(completion)
    }

    /// Returns a mutable reference to the resource, if no task can still access it.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        Arc::get_mut(&mut self.shared).map(|shared| shared.resource.get_mut())
    }

    /// Unwraps the resource, if no task can still access it; otherwise, returns the
    /// wrapper back.
    pub fn into_inner(self) -> Result<R, Self> {
        Arc::try_unwrap(self.shared)
            .map(|shared| shared.resource.into_inner())
            .map_err(|shared| Self { shared })
    }
}

/// Runs an admitted task on a worker thread.
fn execute<R, A, Marker>(
    shared: Arc<Shared<R>>,
    completion: Arc<Completion<A::Output>>,
    accessor: A,
) where
    A: Accessor<R, Marker>,
{
    completion.set_state(TaskState::Running);
    let resource = shared.resource();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe { accessor.invoke(resource) }))
        .map_err(|payload| TaskError::panicked(completion.id(), payload));
    if let Err(error) = &outcome {
        warn!(task = %completion.id(), %error, "accessor panicked");
    }
    // The outcome is published before admission is released, so anything admitted next
    // observes this task as finished.
    let mut cascade = Cascade::default();
    completion.finish(outcome, &mut cascade);
    shared.gate.release(A::ACCESS);
    cascade.run();
}

impl<R> Default for ThreadSafe<R>
where
    R: Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R> From<R> for ThreadSafe<R>
where
    R: Send + Sync + 'static,
{
    fn from(resource: R) -> Self {
        Self::new(resource)
    }
}

impl<R> Debug for ThreadSafe<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ThreadSafe")
            .field("resource", &std::any::type_name::<R>())
            .field("gate", &self.shared.gate)
            .finish()
    }
}
