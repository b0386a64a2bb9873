//! Async debouncing
//!
//! - [`DebouncePrev`]: calls made while an invocation is in flight share its
//!   result; the next call after it settles starts a fresh invocation.
//! - [`DebounceNext`]: calls within the wait window of each other share one
//!   invocation that starts once the window passes without a new call. At most
//!   one invocation runs at a time; a batch that becomes due while one is
//!   running is sealed and started right after it finishes. Calls made after
//!   that open a new batch with its own wait window.

use std::cell::RefCell;
use std::fmt::Debug;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use smol::{Task, Timer};

use crate::window::WindowHandle;

/// Failure of a debounced call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebounceError<E: Debug> {
    /// The shared invocation failed; every coalesced caller gets the same error
    #[error("Debounced call failed: {0:?}")]
    Rejected(E),

    /// The pending batch was dropped before it ran
    #[error("Debounced call canceled")]
    Canceled,
}

type SharedCall<T> = Shared<LocalBoxFuture<'static, T>>;

/// Piggyback debouncing: concurrent callers share the in-flight invocation
pub struct DebouncePrev<A, T: Clone> {
    f: Box<dyn Fn(A) -> LocalBoxFuture<'static, T>>,
    in_flight: RefCell<Option<SharedCall<T>>>,
}

impl<A, T: Clone + 'static> DebouncePrev<A, T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
    {
        Self {
            f: Box::new(move |args| f(args).boxed_local()),
            in_flight: RefCell::new(None),
        }
    }

    /// Join the in-flight invocation, or start one with `args`.
    ///
    /// `args` is ignored when joining.
    pub fn call(&self, args: A) -> SharedCall<T> {
        let mut slot = self.in_flight.borrow_mut();
        if let Some(call) = slot.as_ref() {
            if call.peek().is_none() {
                return call.clone();
            }
        }
        let call = (self.f)(args).shared();
        *slot = Some(call.clone());
        call
    }

    /// Whether an invocation has started and not settled
    pub fn is_pending(&self) -> bool {
        self.in_flight
            .borrow()
            .as_ref()
            .is_some_and(|call| call.peek().is_none())
    }
}

type Waiter<T, E> = oneshot::Sender<Result<T, DebounceError<E>>>;

type Batch<A, T, E> = (A, Vec<Waiter<T, E>>);

struct NextState<A, T, E: Debug> {
    epoch: u64,
    args: Option<A>,
    waiting: Vec<Waiter<T, E>>,
    running: bool,
    /// Batch that became due while an invocation was running
    queued: Option<Batch<A, T, E>>,
    timer: Option<Task<()>>,
}

struct NextInner<A, T, E: Debug> {
    f: Box<dyn Fn(A) -> LocalBoxFuture<'static, Result<T, E>>>,
    wait: Duration,
    window: WindowHandle,
    state: RefCell<NextState<A, T, E>>,
}

/// Trailing-edge debouncing with at most one invocation running
pub struct DebounceNext<A, T, E: Debug> {
    inner: Rc<NextInner<A, T, E>>,
}

impl<A, T, E> DebounceNext<A, T, E>
where
    A: 'static,
    T: Clone + 'static,
    E: Clone + Debug + 'static,
{
    pub fn new<F, Fut>(window: &WindowHandle, wait: Duration, f: F) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Self {
            inner: Rc::new(NextInner {
                f: Box::new(move |args| f(args).boxed_local()),
                wait,
                window: window.clone(),
                state: RefCell::new(NextState {
                    epoch: 0,
                    args: None,
                    waiting: Vec::new(),
                    running: false,
                    queued: None,
                    timer: None,
                }),
            }),
        }
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    /// Queue a call with `args`, restarting the wait window.
    ///
    /// The latest arguments win; every caller in the batch receives the
    /// batch's result.
    pub fn call(&self, args: A) -> impl Future<Output = Result<T, DebounceError<E>>> + 'static {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.state.borrow_mut();
            state.epoch += 1;
            state.args = Some(args);
            state.waiting.push(tx);

            let epoch = state.epoch;
            let inner = Rc::clone(&self.inner);
            // Replacing the previous timer cancels it
            state.timer = Some(self.inner.window.spawn(async move {
                Timer::after(inner.wait).await;
                NextInner::on_timer(&inner, epoch);
            }));
        }
        async move { rx.await.unwrap_or(Err(DebounceError::Canceled)) }
    }

    /// Whether an invocation is running
    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().running
    }

    /// Drop the pending batch; its callers resolve to `Canceled`
    pub fn cancel(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.epoch += 1;
        state.args = None;
        state.queued = None;
        state.timer = None;
        state.waiting.clear();
    }
}

impl<A, T, E> NextInner<A, T, E>
where
    A: 'static,
    T: Clone + 'static,
    E: Clone + Debug + 'static,
{
    fn on_timer(inner: &Rc<Self>, epoch: u64) {
        let mut state = inner.state.borrow_mut();
        if state.epoch != epoch {
            return;
        }
        let Some(args) = state.args.take() else {
            return;
        };
        let mut waiting = std::mem::take(&mut state.waiting);
        if state.running {
            // Merge with a batch already waiting for the running invocation
            if let Some((_, mut earlier)) = state.queued.take() {
                earlier.append(&mut waiting);
                waiting = earlier;
            }
            state.queued = Some((args, waiting));
            return;
        }
        state.running = true;
        drop(state);
        inner
            .window
            .spawn(Self::run(Rc::clone(inner), (args, waiting)))
            .detach();
    }

    async fn run(inner: Rc<Self>, mut batch: Batch<A, T, E>) {
        loop {
            let (args, waiting) = batch;
            tracing::trace!("Debounced invocation for {} callers", waiting.len());
            let result = (inner.f)(args).await.map_err(DebounceError::Rejected);
            for waiter in waiting {
                let _ = waiter.send(result.clone());
            }

            let mut state = inner.state.borrow_mut();
            match state.queued.take() {
                Some(next) => batch = next,
                None => {
                    state.running = false;
                    return;
                }
            }
        }
    }
}
