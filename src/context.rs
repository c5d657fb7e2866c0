//! Cancellation and deadline context for the context-qualified capabilities.
//!
//! A [`Context`] is cheap to clone and immutable once built. Deriving a
//! context with [`Context::with_cancel`], [`Context::with_timeout`] or
//! [`Context::with_deadline`] never affects the parent; the child observes
//! every signal of its parent plus its own.

use std::future::Future;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, SqlRunError};

/// The context used for calls that are not cancellable: no deadline and no
/// cancellation signal.
pub static BACKGROUND: Context = Context {
    deadline: None,
    signals: Vec::new(),
};

/// Cancellation signal and optional deadline carried into a client call.
#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

/// Cancels the context it was created with, and every context derived from it.
///
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// context running until its deadline, if any.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    pub fn background() -> &'static Context {
        &BACKGROUND
    }

    /// Derive a context that is cancelled when the returned handle fires.
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut ctx = self.clone();
        ctx.signals.push(rx);
        (ctx, CancelHandle { tx })
    }

    /// Derive a context that expires at `at`, or at the parent's deadline if
    /// that comes first.
    pub fn with_deadline(&self, at: Instant) -> Context {
        let mut ctx = self.clone();
        ctx.deadline = Some(match self.deadline {
            Some(current) if current < at => current,
            _ => at,
        });
        ctx
    }

    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, or `None` while it is live.
    pub fn err(&self) -> Option<SqlRunError> {
        if self.signals.iter().any(|rx| *rx.borrow()) {
            return Some(SqlRunError::Canceled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(SqlRunError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for [`BACKGROUND`].
    pub async fn done(&self) -> SqlRunError {
        let canceled = async {
            if self.signals.is_empty() {
                return std::future::pending::<()>().await;
            }
            let waits = self.signals.iter().cloned().map(|mut rx| {
                Box::pin(async move {
                    loop {
                        if *rx.borrow_and_update() {
                            return;
                        }
                        if rx.changed().await.is_err() {
                            // handle dropped without cancelling
                            return std::future::pending::<()>().await;
                        }
                    }
                })
            });
            select_all(waits).await;
        };

        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = canceled => SqlRunError::Canceled,
            _ = expired => SqlRunError::DeadlineExceeded,
        }
    }

    /// Race `call` against this context.
    ///
    /// If the context is already done the call is never started. If it
    /// finishes while the call is in flight, the call future is dropped and
    /// the context error returned.
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.run_or_abort(call, || {}).await
    }

    /// Like [`Context::run`], but invokes `abort` when an in-flight call is
    /// interrupted so the client can stop work on its side too.
    pub async fn run_or_abort<F, T, A>(&self, call: F, abort: A) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        A: FnOnce(),
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            err = self.done() => {
                debug!(error = %err, "context finished while call was in flight");
                abort();
                Err(err)
            }
            result = call => result,
        }
    }
}
