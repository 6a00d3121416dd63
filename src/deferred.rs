use crate::Payload;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// A single-assignment asynchronous outcome.
///
/// A [Deferred] settles exactly once, to either `Ok(T)` or `Err(E)`. Clones share the same
/// underlying state so the outcome can be awaited any number of times from any number of places
/// and will always be the same.
///
/// Like any other future a [Deferred] only makes progress while it is being polled.
pub struct Deferred<T, E> {
    inner: Shared<BoxFuture<'static, Result<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E>
where
    T: Payload,
    E: Payload,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T, E> Deferred<T, E>
where
    T: Payload,
    E: Payload,
{
    /// Wrap any future producing a `Result<T, E>`.
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            inner: fut.boxed().shared(),
        }
    }

    /// A deferred result that succeeds with `value` as soon as it is polled.
    pub fn resolved(value: T) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// A deferred result that fails with `err` as soon as it is polled.
    pub fn rejected(err: E) -> Self {
        Self::new(futures::future::ready(Err(err)))
    }

    /// The outcome, if this deferred result has already settled.
    pub fn peek(&self) -> Option<&Result<T, E>> {
        self.inner.peek()
    }

    /// Whether this deferred result has already settled.
    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// Whether `self` and `other` share the same underlying state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T, E> Future for Deferred<T, E>
where
    T: Payload,
    E: Payload,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(ctx)
    }
}
