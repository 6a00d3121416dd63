//! Adapters between routines, callback-style functions and timers.
use crate::{Deferred, Driver, Error, Handle, Payload, Routine, Yielded, scheduler::Scheduler};
use futures::channel::oneshot::{self, Canceled};
use std::{future::Future, time::Duration};
use tokio::{task::JoinHandle, time::Instant};
use tracing::warn;

/// A completion callback, invoked exactly once with the outcome of an operation.
pub type Callback<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

/// Wrap a routine body taking arguments so that it can be called with those arguments and a
/// trailing [Callback].
///
/// Each call initializes a new routine, drives it with `driver` and reports its outcome through
/// the callback from a spawned tokio task. The handle to that task is returned.
///
/// # Panics
/// Calling the returned function outside of a tokio runtime will panic.
pub fn callbackify<A, T, E, S, F, Fut>(
    driver: Driver<S>,
    f: F,
) -> impl Fn(A, Callback<T, E>) -> JoinHandle<()> + Send + Sync
where
    A: Send + 'static,
    T: Payload,
    E: Payload,
    S: Scheduler,
    F: Fn(A, Handle<T, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    move |args, done| {
        let deferred = driver.drive_routine(Routine::new(|handle| f(args, handle)));

        tokio::spawn(async move { done(deferred.await) })
    }
}

/// Wrap a callback-style function so that it returns a [Deferred] instead.
///
/// The wrapped function is called immediately with its arguments and a [Callback] that settles
/// the returned [Deferred]. If that callback is dropped without being called the result fails
/// with `E::from(Canceled)`.
pub fn promisify<A, T, E, F>(f: F) -> impl Fn(A) -> Deferred<T, E> + Send + Sync
where
    T: Payload,
    E: Payload + From<Canceled>,
    F: Fn(A, Callback<T, E>) + Send + Sync + 'static,
{
    move |args| {
        let (tx, rx) = oneshot::channel::<Result<T, E>>();
        f(
            args,
            Box::new(move |res: Result<T, E>| {
                // The receiver is only gone if nobody is waiting on the result
                let _ = tx.send(res);
            }),
        );

        Deferred::new(async move { rx.await.unwrap_or_else(|canceled| Err(E::from(canceled))) })
    }
}

/// Drive `input` and race the result against a timer.
///
/// The clock starts when `timeout` is called. If `limit` elapses first the returned [Deferred]
/// fails with [Error::Timeout]. The underlying drive is moved to a detached tokio task when the
/// guard is first polled, so the routine keeps running to completion in the background: only its
/// result is abandoned. A zero `limit` disables the timer.
///
/// # Errors
/// Returns [Error::InvalidInput] under the same conditions as [Driver::drive].
///
/// # Panics
/// Polling the returned [Deferred] outside of a tokio runtime will panic.
pub fn timeout<T, E, S>(
    driver: &Driver<S>,
    input: impl Into<Yielded<T, E>>,
    limit: Duration,
) -> Result<Deferred<T, Error<E>>, Error<E>>
where
    T: Payload,
    E: Payload,
    S: Scheduler,
{
    let deferred = driver.drive(input)?;

    if limit.is_zero() {
        return Ok(Deferred::new(async move {
            deferred.await.map_err(Error::Routine)
        }));
    }

    let deadline = Instant::now() + limit;

    Ok(Deferred::new(async move {
        tokio::spawn(deferred.clone());

        match tokio::time::timeout_at(deadline, deferred).await {
            Ok(res) => res.map_err(Error::Routine),
            Err(_) => {
                warn!(?limit, "routine timed out");
                Err(Error::Timeout(limit))
            }
        }
    }))
}
