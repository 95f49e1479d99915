//! Test bodies and hooks
//!
//! A [`Runnable`] is the code attached to a case or a hook. Three shapes are
//! supported:
//!
//! - [`Runnable::sync`]: a plain function; returning normally passes, an error
//!   or a panic fails. No timer is armed.
//! - [`Runnable::future`]: a function returning a future; the future is raced
//!   against the timeout and dropped if the timer wins.
//! - [`Runnable::callback`]: a function handed a [`Done`] signal; the attempt
//!   settles when the signal is settled, typically from a spawned task.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type SyncFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;
type FutureFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;
type CallbackFn = dyn Fn(Done) + Send + Sync;

/// Body of a case or a hook
#[derive(Clone)]
pub enum Runnable {
    Sync(Arc<SyncFn>),
    Future(Arc<FutureFn>),
    Callback(Arc<CallbackFn>),
}

impl Runnable {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Runnable::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Runnable::Future(Arc::new(move || f().boxed()))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        Runnable::Callback(Arc::new(f))
    }

    /// Short name of the runnable shape, used in logs
    pub fn shape(&self) -> &'static str {
        match self {
            Runnable::Sync(_) => "sync",
            Runnable::Future(_) => "future",
            Runnable::Callback(_) => "callback",
        }
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runnable::{}", self.shape())
    }
}

/// Completion signal handed to callback runnables.
///
/// Each attempt gets its own signal and its own cancellation token. Once the
/// attempt has timed out the token is cancelled and any later settlement is
/// discarded, so a slow body can never leak its outcome into a retry.
#[derive(Debug)]
pub struct Done {
    sender: oneshot::Sender<anyhow::Result<()>>,
    token: CancellationToken,
    attempt: u32,
}

impl Done {
    pub(crate) fn new(
        attempt: u32,
        token: CancellationToken,
    ) -> (Self, oneshot::Receiver<anyhow::Result<()>>) {
        let (sender, receiver) = oneshot::channel();
        let done = Self {
            sender,
            token,
            attempt,
        };
        (done, receiver)
    }

    /// 1-based number of the attempt this signal belongs to
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// True once the attempt has been abandoned by its timer
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the attempt is abandoned
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Settle the attempt as passed. Returns false if the settlement was discarded.
    pub fn pass(self) -> bool {
        self.settle(Ok(()))
    }

    /// Settle the attempt as failed. Returns false if the settlement was discarded.
    pub fn fail(self, error: impl Into<anyhow::Error>) -> bool {
        self.settle(Err(error.into()))
    }

    pub fn settle(self, result: anyhow::Result<()>) -> bool {
        if self.token.is_cancelled() {
            debug!("Discarding settlement of abandoned attempt {}", self.attempt);
            return false;
        }
        self.sender.send(result).is_ok()
    }
}

/// Lifecycle hook kinds a suite may register, at most one of each
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn name(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "before all",
            HookKind::AfterAll => "after all",
            HookKind::BeforeEach => "before each",
            HookKind::AfterEach => "after each",
        }
    }

    pub fn is_each(&self) -> bool {
        matches!(self, HookKind::BeforeEach | HookKind::AfterEach)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runnable_shapes() {
        assert_eq!(Runnable::sync(|| Ok(())).shape(), "sync");
        assert_eq!(Runnable::future(|| async { Ok(()) }).shape(), "future");
        let callback = Runnable::callback(|done| {
            done.pass();
        });
        assert_eq!(callback.shape(), "callback");
    }

    #[tokio::test]
    async fn test_done_delivers_settlement() {
        let (done, receiver) = Done::new(1, CancellationToken::new());
        assert_eq!(done.attempt(), 1);
        assert!(done.pass());
        assert!(receiver.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_done_discards_after_cancel() {
        let token = CancellationToken::new();
        let (done, mut receiver) = Done::new(2, token.clone());
        token.cancel();
        assert!(done.is_cancelled());
        assert!(!done.fail(anyhow::anyhow!("late")));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_done_closes_channel() {
        let (done, receiver) = Done::new(1, CancellationToken::new());
        drop(done);
        assert!(receiver.await.is_err());
    }

    #[test]
    fn test_hook_kind_names() {
        assert_eq!(HookKind::BeforeEach.to_string(), "before each");
        assert!(HookKind::AfterEach.is_each());
        assert!(!HookKind::AfterAll.is_each());
    }
}
