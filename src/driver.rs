//! Driving routines to completion.
use crate::{
    Deferred, Error, Payload, ReadyRoutine, RoutineFn, Step, Yielded,
    scheduler::{Scheduler, YieldOnce},
};
use async_recursion::async_recursion;
use tracing::{Instrument, debug, debug_span, trace};

/// Repeatedly resumes routines, resolving whatever they yield, and reduces each one to a single
/// [Deferred] result.
///
/// A [Driver] holds no state of its own beyond the [Scheduler] it uses to yield control for
/// plain values, so it is cheap to clone and can drive any number of independent routines.
#[derive(Debug, Clone)]
pub struct Driver<S = YieldOnce> {
    scheduler: S,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(YieldOnce)
    }
}

impl<S> Driver<S>
where
    S: Scheduler,
{
    /// Construct a new [Driver] that yields to the host loop using `scheduler`.
    pub fn new(scheduler: S) -> Self {
        Self { scheduler }
    }

    /// Drive `input` to completion.
    ///
    /// - A [Deferred] is returned as is.
    /// - A [RoutineFn] is called to initialize a routine which is then driven.
    /// - A routine is driven as described in [drive_routine][Driver::drive_routine].
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] if `input` is a plain value. This is the only failure
    /// reported directly: everything that goes wrong once driving has started settles the
    /// returned [Deferred] instead.
    pub fn drive<T, E>(&self, input: impl Into<Yielded<T, E>>) -> Result<Deferred<T, E>, Error<E>>
    where
        T: Payload,
        E: Payload,
    {
        match input.into() {
            Yielded::Deferred(deferred) => Ok(deferred),
            Yielded::Routine(routine) => Ok(self.drive_routine(*routine)),
            Yielded::RoutineFn(init) => Ok(self.drive_routine(init.call())),
            Yielded::Value(_) => Err(Error::InvalidInput),
        }
    }

    /// Drive a routine to completion.
    ///
    /// Each time the routine suspends, the value it yielded determines how it is resumed:
    ///
    /// - [Yielded::Deferred]: once it settles, success is sent back to the routine and failure
    ///   is thrown into it at the suspension point.
    /// - [Yielded::Routine] and [Yielded::RoutineFn]: the nested routine is driven to completion
    ///   and its outcome handled in the same way as a deferred result.
    /// - [Yielded::Value]: after a single tick of the scheduler the value is sent back as is.
    ///
    /// The returned [Deferred] settles with whatever the routine completes with.
    pub fn drive_routine<T, E>(&self, routine: ReadyRoutine<T, E>) -> Deferred<T, E>
    where
        T: Payload,
        E: Payload,
    {
        Deferred::new(run(self.scheduler.clone(), routine).instrument(debug_span!("drive")))
    }

    /// Once `first` succeeds, drive a new routine from `next`.
    ///
    /// If `first` fails then `next` is never called and the returned [Deferred] settles with
    /// the same failure.
    pub fn chain<T, E>(&self, first: Deferred<T, E>, next: RoutineFn<T, E>) -> Deferred<T, E>
    where
        T: Payload,
        E: Payload,
    {
        let scheduler = self.scheduler.clone();

        Deferred::new(
            async move {
                first.await?;
                run(scheduler, next.call()).await
            }
            .instrument(debug_span!("chain")),
        )
    }
}

#[async_recursion]
async fn run<T, E, S>(scheduler: S, mut routine: ReadyRoutine<T, E>) -> Result<T, E>
where
    T: Payload,
    E: Payload,
    S: Scheduler,
{
    loop {
        let (suspended, yielded) = match routine.resume() {
            Step::Complete(res) => {
                trace!(ok = res.is_ok(), "routine complete");
                return res;
            }
            Step::Pending(suspended, yielded) => (suspended, yielded),
        };

        trace!(kind = %yielded.kind(), "routine suspended");
        let outcome = match yielded {
            Yielded::Deferred(deferred) => deferred.await,
            Yielded::Routine(nested) => run(scheduler.clone(), *nested).await,
            Yielded::RoutineFn(init) => run(scheduler.clone(), init.call()).await,
            Yielded::Value(value) => {
                scheduler.defer().await;
                Ok(value)
            }
        };

        routine = match outcome {
            Ok(value) => suspended.send(value),
            Err(err) => {
                debug!("injecting failure into suspended routine");
                suspended.throw(err)
            }
        };
    }
}
