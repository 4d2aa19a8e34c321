//! One-shot continuations
//!
//! Every asynchronous lifecycle operation reports its outcome through a
//! [`Completion`]. A completion is consumed when it fires, so the type system
//! rules out double delivery; a completion dropped without firing delivers
//! [`MonError::CompletionDropped`] from its `Drop` impl, so the callback still
//! runs exactly once when a task panics or is abandoned.
//!
//! Completions compose by wrapping: [`Completion::on_complete`] returns a new
//! completion that delivers to the wrapped one and then runs a hook. Wrapping
//! can be nested to any depth without losing the exactly-once guarantee.

use crate::error::{MonError, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Callback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// One-shot success/failure continuation.
#[must_use = "a completion fails with CompletionDropped if it is never fired"]
pub struct Completion<T: Send + 'static> {
    callback: Option<Callback<T>>,
}

impl<T: Send + 'static> Completion<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// A completion paired with a future resolving to its outcome.
    pub fn channel() -> (Self, Promise<T>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move |result| {
            // Receiver gone means nobody is waiting any more.
            let _ = tx.send(result);
        });
        (completion, Promise { rx })
    }

    pub fn success(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, error: MonError) {
        self.complete(Err(error));
    }

    pub fn complete(mut self, result: Result<T>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }

    /// Wrap this completion so that `hook` runs right after the outcome has
    /// been delivered, whichever way it went.
    pub fn on_complete<F>(self, hook: F) -> Completion<T>
    where
        F: FnOnce() + Send + 'static,
    {
        Completion::new(move |result| {
            self.complete(result);
            hook();
        })
    }
}

impl<T: Send + 'static> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(MonError::CompletionDropped));
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("fired", &self.callback.is_none())
            .finish()
    }
}

/// Awaitable side of [`Completion::channel`].
#[derive(Debug)]
pub struct Promise<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(MonError::CompletionDropped)))
    }
}
