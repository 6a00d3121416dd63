//! Drive async/await routines that yield pending work to a single deferred result.
//!
//! A routine is an `async` body that suspends through a [Handle], handing a [Yielded] value to
//! whatever is driving it and receiving back either a value or a failure injected at the
//! suspension point. A [Driver] resumes routines until they complete, resolving everything they
//! yield along the way:
//!
//! ```
//! use setlist::{Deferred, Driver, Handle, RoutineFn, Yielded};
//!
//! let inner = RoutineFn::new(|handle: Handle<u32, String>| async move {
//!     let n = handle.yield_value(Deferred::resolved(20)).await?;
//!     Ok(n + 1)
//! });
//!
//! let outer = RoutineFn::new(move |handle: Handle<u32, String>| {
//!     let inner = inner.clone();
//!     async move {
//!         let n = handle.yield_value(inner).await?;
//!         let n = handle.yield_value(Yielded::Value(n * 2)).await?;
//!         Ok(n)
//!     }
//! });
//!
//! let deferred = Driver::default().drive(outer).unwrap();
//! assert_eq!(futures::executor::block_on(deferred), Ok(42));
//! ```
#![warn(
    clippy::complexity,
    clippy::correctness,
    clippy::style,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    rustdoc::all,
    clippy::undocumented_unsafe_blocks
)]

mod adapter;
mod coro;
mod deferred;
mod driver;
mod error;
pub mod scheduler;
mod yielded;

pub use adapter::{Callback, callbackify, promisify, timeout};
pub use coro::{
    AsRoutine, Handle, Lifecycle, Pending, PendingRoutine, Ready, ReadyRoutine, Routine,
    RoutineFn, Step,
};
pub use deferred::Deferred;
pub use driver::Driver;
pub use error::Error;
pub use scheduler::Scheduler;
pub use yielded::{Kind, Yielded};

/// The bounds required of values and failures passing through a [Driver].
///
/// Outcomes are shared between every clone of a [Deferred] so they must be [Clone], and
/// routines may be moved between threads while suspended.
pub trait Payload: Clone + Send + Sync + 'static {}
impl<P> Payload for P where P: Clone + Send + Sync + 'static {}

/// Drive `input` to completion using a default [Driver].
///
/// See [Driver::drive] for details.
///
/// # Errors
/// Returns [Error::InvalidInput] if `input` is a plain value.
pub fn drive<T, E>(input: impl Into<Yielded<T, E>>) -> Result<Deferred<T, E>, Error<E>>
where
    T: Payload,
    E: Payload,
{
    Driver::default().drive(input)
}
