//! Routines: `async` bodies that suspend through a [Handle] and are resumed by hand or by a
//! [Driver][crate::Driver].
use crate::{Payload, Yielded};
use futures::future::BoxFuture;
use std::{
    fmt,
    future::Future,
    marker::PhantomData,
    pin::Pin,
    ptr,
    sync::Arc,
    task::{Context, Poll, RawWaker, RawWakerVTable, Waker},
};

/// A type that can construct a [Routine].
///
/// This is the type level equivalent of a [RoutineFn].
pub trait AsRoutine: Sized + 'static {
    /// The value produced when the routine succeeds and the value it is resumed with
    type Ok: Payload;
    /// The failure the routine settles with or has injected at a suspension point
    type Err: Payload;

    /// Return the body of the routine.
    ///
    /// # Panics
    /// Any calls to async methods or functions other than those provided by [Handle] will panic.
    fn run(
        handle: Handle<Self::Ok, Self::Err>,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>> + Send + 'static;

    /// Initialize a new [Routine] using this type as a constructor.
    fn initialize() -> ReadyRoutine<Self::Ok, Self::Err> {
        Routine::new(Self::run)
    }

    /// A [RoutineFn] that initializes a new [Routine] from this type each time it is called.
    fn constructor() -> RoutineFn<Self::Ok, Self::Err> {
        RoutineFn::new(Self::run)
    }
}

#[derive(Debug)]
struct SharedState<S, R> {
    s: Option<S>,
    r: Option<R>,
}

impl<S, R> Default for SharedState<S, R> {
    fn default() -> Self {
        Self { s: None, r: None }
    }
}

/// The lifecycle state of a [Routine]: either [Pending] or [Ready].
pub trait Lifecycle: fmt::Debug {}

/// Ready for the next call to [Routine::resume]
#[derive(Debug)]
pub struct Ready;
impl Lifecycle for Ready {}

/// Suspended, awaiting a call to [Routine::send] or [Routine::throw].
#[derive(Debug)]
pub struct Pending;
impl Lifecycle for Pending {}

/// A [Routine] that is ready to be resumed
pub type ReadyRoutine<T, E> = Routine<T, E, Ready>;

/// A [Routine] that is suspended and waiting for a value or a failure
pub type PendingRoutine<T, E> = Routine<T, E, Pending>;

/// A suspend/resume computation that yields [Yielded] values and completes with a
/// `Result<T, E>`.
pub struct Routine<T, E, L = Ready>
where
    L: Lifecycle,
{
    _lifecycle: L,
    state: SharedState<Yielded<T, E>, Result<T, E>>,
    fut: BoxFuture<'static, Result<T, E>>,
}

impl<T, E, L> fmt::Debug for Routine<T, E, L>
where
    L: Lifecycle,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("lifecycle", &self._lifecycle)
            .finish()
    }
}

impl<T, E> Routine<T, E, Ready>
where
    T: Payload,
    E: Payload,
{
    /// Create a new routine from its body.
    ///
    /// The body is called immediately to build the underlying future but does not start
    /// running until the first call to [resume][Routine::resume].
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Handle<T, E>) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Routine {
            _lifecycle: Ready,
            state: SharedState::default(),
            fut: Box::pin(f(Handle {
                _ok: PhantomData,
                _err: PhantomData,
            })),
        }
    }
}

impl<F, T, E, Fut> From<F> for ReadyRoutine<T, E>
where
    F: FnOnce(Handle<T, E>) -> Fut,
    T: Payload,
    E: Payload,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fn from(f: F) -> Self {
        Routine::new(f)
    }
}

static WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(clone_callback, |_| {}, |_| {}, |_| {});
unsafe fn clone_callback(ptr: *const ()) -> RawWaker {
    RawWaker::new(ptr, &WAKER_VTABLE)
}

impl<T, E> Routine<T, E, Ready> {
    /// Run the routine to its next suspension point.
    ///
    /// A routine that has just been created, or that has been given a reply through
    /// [send][Routine::send] or [throw][Routine::throw], runs until it either suspends again
    /// or completes.
    pub fn resume(mut self) -> Step<T, E> {
        // SAFETY: we never use this waker for its intended purpose
        let waker = unsafe {
            Waker::from_raw(RawWaker::new(
                ptr::from_mut(&mut self.state).cast::<()>().cast_const(),
                &WAKER_VTABLE,
            ))
        };
        let mut ctx = Context::from_waker(&waker);
        match self.fut.as_mut().poll(&mut ctx) {
            Poll::Ready(res) => Step::Complete(res),
            Poll::Pending => {
                let yielded = self
                    .state
                    .s
                    .take()
                    .expect("a routine awaited a future other than those provided by Handle");

                let routine = Routine {
                    _lifecycle: Pending,
                    state: self.state,
                    fut: self.fut,
                };

                Step::Pending(routine, yielded)
            }
        }
    }
}

impl<T, E> Routine<T, E, Pending> {
    /// Reply to the suspended routine with a value.
    pub fn send(self, value: T) -> ReadyRoutine<T, E> {
        self.reply(Ok(value))
    }

    /// Inject a failure at the suspension point: the routine observes `Err(err)` from the
    /// [Handle] call it is suspended in and may recover from it or propagate it.
    pub fn throw(self, err: E) -> ReadyRoutine<T, E> {
        self.reply(Err(err))
    }

    fn reply(mut self, r: Result<T, E>) -> ReadyRoutine<T, E> {
        self.state.r = Some(r);

        Routine {
            _lifecycle: Ready,
            state: self.state,
            fut: self.fut,
        }
    }
}

/// The outcome of a single call to [Routine::resume]
pub enum Step<T, E> {
    /// The routine suspended with the given value
    Pending(PendingRoutine<T, E>, Yielded<T, E>),
    /// The routine is now complete
    Complete(Result<T, E>),
}

impl<T, E> fmt::Debug for Step<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(routine, yielded) => {
                f.debug_tuple("Pending").field(routine).field(yielded).finish()
            }
            Self::Complete(Ok(_)) => f.debug_tuple("Complete").field(&"Ok").finish(),
            Self::Complete(Err(_)) => f.debug_tuple("Complete").field(&"Err").finish(),
        }
    }
}

/// A constructor for [Routine]s: calling it with no arguments initializes a fresh routine.
pub struct RoutineFn<T, E> {
    init: Arc<dyn Fn() -> ReadyRoutine<T, E> + Send + Sync>,
}

impl<T, E> Clone for RoutineFn<T, E> {
    fn clone(&self) -> Self {
        Self {
            init: self.init.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RoutineFn<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineFn").finish_non_exhaustive()
    }
}

impl<T, E> RoutineFn<T, E>
where
    T: Payload,
    E: Payload,
{
    /// Wrap a routine body so that it can be instantiated any number of times.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Handle<T, E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            init: Arc::new(move || Routine::new(&f)),
        }
    }

    /// Initialize a new [Routine].
    pub fn call(&self) -> ReadyRoutine<T, E> {
        (self.init)()
    }
}

/// A suspend handle to facilitate communication between a [Routine] and the logic driving it.
///
/// The only way to obtain a [Handle] is as the argument of a routine body passed to
/// [Routine::new], [RoutineFn::new] or [AsRoutine::run].
///
/// # Panics
/// Awaiting anything inside a routine body other than the futures returned by [Handle] methods
/// (directly or through nested async functions) will panic when the routine is resumed. Hand
/// such futures to the driver with [wait][Handle::wait] instead.
#[derive(Debug)]
pub struct Handle<T, E> {
    _ok: PhantomData<fn() -> T>,
    _err: PhantomData<fn() -> E>,
}

impl<T, E> Clone for Handle<T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Handle<T, E> {}

impl<T, E> Handle<T, E>
where
    T: Payload,
    E: Payload,
{
    /// Suspend, handing `yielded` to the code driving this routine, and return whatever it
    /// replies with.
    ///
    /// An `Err` is a failure injected at this suspension point: propagate it with `?` or
    /// handle it locally.
    pub async fn yield_value(&self, yielded: impl Into<Yielded<T, E>>) -> Result<T, E> {
        Yield {
            polled: false,
            s: Some(yielded.into()),
            _r: PhantomData,
        }
        .await
    }

    /// Suspend until `fut` settles and return its outcome.
    ///
    /// Any future producing a `Result<T, E>` is accepted and wrapped as a
    /// [Deferred][crate::Deferred] before being yielded.
    pub async fn wait<F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.yield_value(crate::Deferred::new(fut)).await
    }

    /// Run another routine inline until it completes.
    ///
    /// Suspensions of the inner routine are passed straight through to whatever is driving
    /// this one and the replies are handed back to it. A routine that has already been stepped
    /// by hand picks up from where it was left, including any reply queued with
    /// [send][Routine::send] or [throw][Routine::throw].
    pub async fn yield_from<R>(&self, routine: R) -> Result<T, E>
    where
        R: Into<ReadyRoutine<T, E>>,
    {
        let mut routine = routine.into();

        loop {
            routine = match routine.resume() {
                Step::Complete(res) => return res,
                Step::Pending(suspended, yielded) => match self.yield_value(yielded).await {
                    Ok(value) => suspended.send(value),
                    Err(err) => suspended.throw(err),
                },
            };
        }
    }
}

struct Yield<S, R> {
    polled: bool,
    s: Option<S>,
    _r: PhantomData<fn() -> R>,
}

// Nothing inside of Yield is ever pinned
impl<S, R> Unpin for Yield<S, R> {}

impl<S, R> Future for Yield<S, R> {
    type Output = R;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<R> {
        assert!(
            ptr::eq(ctx.waker().vtable(), &WAKER_VTABLE),
            "a routine awaited a future other than those provided by Handle"
        );

        if self.polled {
            // SAFETY: the vtable check above means this waker was built by Routine::resume
            // around a SharedState<S, R>, and we only ever access the shared state from here
            // or inside of Routine::resume which never execute at the same time.
            let data = unsafe {
                (ctx.waker().data() as *mut () as *mut SharedState<S, R>)
                    .as_mut()
                    .unwrap_unchecked()
                    .r
                    .take()
                    // should not be possible
                    .expect("shared state was not set before resuming")
            };

            Poll::Ready(data)
        } else {
            self.polled = true;
            // SAFETY: as above
            unsafe {
                (ctx.waker().data() as *mut () as *mut SharedState<S, R>)
                    .as_mut()
                    .unwrap_unchecked()
                    .s = Some(self.s.take().unwrap_unchecked());
            };

            Poll::Pending
        }
    }
}
