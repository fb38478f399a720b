//! Off-thread execution of slow filesystem work.

use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::Sender;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::LifecycleError;

/// Runs blocking work units on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    handle: Handle,
}

impl TaskScheduler {
    /// Schedule onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime the caller is running inside, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Run `work` on the blocking pool.
    pub fn submit<T, F>(&self, work: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, LifecycleError> + Send + 'static,
    {
        PendingOperation {
            inner: self.handle.spawn_blocking(work),
        }
    }
}

/// Result of a background world operation.
///
/// Dropping it does not cancel the work.
#[derive(Debug)]
pub struct PendingOperation<T> {
    inner: JoinHandle<Result<T, LifecycleError>>,
}

impl<T> PendingOperation<T> {
    /// Whether the work has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T> Future for PendingOperation<T> {
    type Output = Result<T, LifecycleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(err) => Err(LifecycleError::TaskAborted(err.to_string())),
        })
    }
}

/// Message sent from a worker back to the control thread.
#[derive(Debug)]
pub(crate) enum Completion<P> {
    /// A copy that suspended autosave has finished.
    AutosaveResumed,
    /// A world folder is gone and its bookkeeping can be released.
    Deleted(P),
}

/// Sends its completion when dropped, so a panicking worker still reports.
pub(crate) struct CompletionGuard<P> {
    tx: Sender<Completion<P>>,
    message: Option<Completion<P>>,
}

impl<P> CompletionGuard<P> {
    pub(crate) fn new(tx: Sender<Completion<P>>, message: Completion<P>) -> Self {
        Self {
            tx,
            message: Some(message),
        }
    }
}

impl<P> Drop for CompletionGuard<P> {
    fn drop(&mut self) {
        if let Some(message) = self.message.take() {
            if self.tx.send(message).is_err() {
                debug!("Completion dropped: manager is gone");
            }
        }
    }
}
