use std::ptr::NonNull;

/// Kind of access an accessor requests, inferred from its signature.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Access {
    /// Shared access; any number of readers may run together.
    Read,
    /// Exclusive access; runs alone.
    Write,
}

/// Marker for accessors taking `&R`.
pub struct Ref;

/// Marker for accessors taking `&mut R`.
pub struct Mut;

/// Automatically implemented on all closures and functions that take either `&R` or `&mut R`
/// as their single argument.
///
/// The `Marker` parameter only disambiguates the two blanket implementations and is always
/// inferred. Closures must annotate their argument type, since the access mode is read
/// from it:
/// ```rust
/// # use threadsafe::ThreadSafe;
/// let value = ThreadSafe::new(0u32);
/// value.sync(|value: &mut u32| *value += 1);
/// assert_eq!(value.sync(|value: &u32| *value), 1);
/// ```
/// An accessor whose argument can't be determined is rejected at compile time:
/// ```compile_fail
/// # use threadsafe::ThreadSafe;
/// let value = ThreadSafe::new(0u32);
/// value.sync(|value| *value);
/// ```
/// The trait is sealed; the two blanket implementations are the only ones:
/// ```compile_fail
/// # use std::ptr::NonNull;
/// # use threadsafe::{Access, Accessor};
/// struct Sneaky;
///
/// impl Accessor<u32, ()> for Sneaky {
///     type Output = ();
///     const ACCESS: Access = Access::Read;
///
///     unsafe fn invoke(self, mut resource: NonNull<u32>) {
///         *resource.as_mut() = 1;
///     }
/// }
/// ```
pub trait Accessor<R, Marker>: sealed::Sealed<R, Marker> + Sized {
    /// Value produced by the accessor.
    type Output;

    /// Access mode this accessor needs.
    const ACCESS: Access;

    /// Invokes the accessor.
    ///
    /// # Safety
    /// The caller must hold admission matching `Self::ACCESS` for the whole call, and
    /// `resource` must point to a live value.
    #[doc(hidden)]
    unsafe fn invoke(self, resource: NonNull<R>) -> Self::Output;
}

mod sealed {
    pub trait Sealed<R, Marker> {}
}

impl<R, T, F> sealed::Sealed<R, (Ref, T)> for F where F: FnOnce(&R) -> T {}

impl<R, T, F> sealed::Sealed<R, (Mut, T)> for F where F: FnOnce(&mut R) -> T {}

impl<R, T, F> Accessor<R, (Ref, T)> for F
where
    F: FnOnce(&R) -> T,
{
    type Output = T;

    const ACCESS: Access = Access::Read;

    unsafe fn invoke(self, resource: NonNull<R>) -> T {
        self(resource.as_ref())
    }
}

impl<R, T, F> Accessor<R, (Mut, T)> for F
where
    F: FnOnce(&mut R) -> T,
{
    type Output = T;

    const ACCESS: Access = Access::Write;

    unsafe fn invoke(self, mut resource: NonNull<R>) -> T {
        self(resource.as_mut())
    }
}
