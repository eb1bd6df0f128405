//! Racing an operation against a deadline.

use std::future::Future;
use std::time::Duration;

/// Outcome of [`bounded_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Bounded<T> {
    /// The operation finished before the deadline.
    Completed(T),
    /// The deadline fired first; the operation was dropped.
    TimedOut,
}

impl<T> Bounded<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Bounded::TimedOut)
    }

    /// Converts into a `Result`, producing the error with `on_timeout`.
    pub fn or_else_timeout<E>(self, on_timeout: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Bounded::Completed(value) => Ok(value),
            Bounded::TimedOut => Err(on_timeout()),
        }
    }
}

/// Runs `op` against a `limit` timer.
///
/// Whichever resolves first decides the outcome and the other is dropped on
/// the spot, so a completed operation never leaves a pending timer behind.
/// `on_timeout` runs only when the timer wins, after `op` has been dropped.
pub async fn bounded_wait<F, H>(op: F, limit: Duration, on_timeout: H) -> Bounded<F::Output>
where
    F: Future,
    H: FnOnce(),
{
    let outcome = {
        let sleep = tokio::time::sleep(limit);
        tokio::select! {
            biased;
            value = op => Bounded::Completed(value),
            _ = sleep => Bounded::TimedOut,
        }
    };

    if outcome.is_timed_out() {
        on_timeout();
    }
    outcome
}

/// Like [`bounded_wait`] but surfaces the timeout as the error built by `on_timeout`.
pub async fn timeout_after<F, E, H>(op: F, limit: Duration, on_timeout: H) -> Result<F::Output, E>
where
    F: Future,
    H: FnOnce() -> E,
{
    bounded_wait(op, limit, || {}).await.or_else_timeout(on_timeout)
}
