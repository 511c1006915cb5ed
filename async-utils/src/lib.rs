//! Async utilities for cancellation- and deadline-aware futures.
//!
//! Provides the `OrCancelExt` trait for racing futures against tokio's
//! `CancellationToken` and an optional overall [`Deadline`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Error returned when a future is abandoned before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelErr {
    Cancelled,
    DeadlineExceeded,
}

/// An optional point in time after which work must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never fires.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    /// `Some(budget)` becomes a deadline, `None` never fires.
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map_or_else(Self::none, Self::after)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    async fn elapsed(self) {
        match self.at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

/// Extension trait for making futures cancellable.
///
/// Allows any future to race against a `CancellationToken`, returning
/// `Err(CancelErr::Cancelled)` if the token is cancelled before the
/// future completes.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// Race this future against the cancellation token.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr>;

    /// Race this future against the token and the deadline, whichever fires
    /// first. Cancellation wins a tie.
    async fn or_cancel_by(
        self,
        token: &CancellationToken,
        deadline: Deadline,
    ) -> Result<Self::Output, CancelErr>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            res = self => Ok(res),
        }
    }

    async fn or_cancel_by(
        self,
        token: &CancellationToken,
        deadline: Deadline,
    ) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            _ = deadline.elapsed() => Err(CancelErr::DeadlineExceeded),
            res = self => Ok(res),
        }
    }
}

/// Sleeps for `duration` unless cancelled or past the deadline first.
pub async fn sleep_or_cancel(
    duration: Duration,
    token: &CancellationToken,
    deadline: Deadline,
) -> Result<(), CancelErr> {
    tokio::time::sleep(duration)
        .or_cancel_by(token, deadline)
        .await
}
