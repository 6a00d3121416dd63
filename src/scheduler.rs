//! The cooperative "defer to the next tick" primitive used by a [Driver][crate::Driver].
use futures::future::BoxFuture;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// A way of handing control back to the host loop for a single tick without blocking the
/// calling thread.
pub trait Scheduler: Clone + Send + Sync + 'static {
    /// Return a future that completes once the host loop has had a chance to run other work.
    fn defer(&self) -> BoxFuture<'static, ()>;
}

/// Returns [Poll::Pending] exactly once, immediately waking the current task.
///
/// This works with any executor and is the default for [Driver][crate::Driver].
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldOnce;

impl Scheduler for YieldOnce {
    fn defer(&self) -> BoxFuture<'static, ()> {
        Box::pin(Tick { yielded: false })
    }
}

/// Defers using [tokio::task::yield_now] so that tokio's own scheduling is respected.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tokio;

impl Scheduler for Tokio {
    fn defer(&self) -> BoxFuture<'static, ()> {
        Box::pin(tokio::task::yield_now())
    }
}

struct Tick {
    yielded: bool,
}

impl Future for Tick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            ctx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
