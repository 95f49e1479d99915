//! Attempt protocol
//!
//! One attempt invokes a runnable and races it against a freshly armed timer.
//! Failed attempts are retried in a bounded loop until the retry budget runs out.

use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TestError;
use crate::runnable::{Done, Runnable};

/// Result of running a runnable with its retry budget
#[derive(Debug)]
pub(crate) struct AttemptOutcome {
    pub result: Result<(), TestError>,
    pub attempts: u32,
}

/// Run `runnable` up to `retries + 1` times, stopping at the first success.
/// The timer is re-armed for every attempt.
pub(crate) async fn run_with_retries(
    runnable: &Runnable,
    title: &str,
    timeout: Duration,
    retries: u32,
) -> AttemptOutcome {
    let mut attempt = 1;

    loop {
        match run_attempt(runnable, title, timeout, attempt).await {
            Ok(()) => {
                return AttemptOutcome {
                    result: Ok(()),
                    attempts: attempt,
                }
            }
            Err(e) if attempt <= retries => {
                debug!(
                    "Attempt {}/{} of \"{}\" failed: {}",
                    attempt,
                    retries.saturating_add(1),
                    title,
                    e
                );
                attempt += 1;
            }
            Err(e) => {
                return AttemptOutcome {
                    result: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}

/// Run a single attempt
pub(crate) async fn run_attempt(
    runnable: &Runnable,
    title: &str,
    timeout: Duration,
    attempt: u32,
) -> Result<(), TestError> {
    match runnable {
        Runnable::Sync(f) => {
            let f = Arc::clone(f);
            match panic::catch_unwind(AssertUnwindSafe(|| f())) {
                Ok(result) => result.map_err(TestError::failed),
                Err(payload) => Err(TestError::Panicked(panic_message(payload))),
            }
        }
        Runnable::Future(f) => {
            let f = Arc::clone(f);
            let body = AssertUnwindSafe(async move { f().await }).catch_unwind();

            // Dropping `body` on timeout cancels the attempt.
            match time::timeout(timeout, body).await {
                Ok(Ok(result)) => result.map_err(TestError::failed),
                Ok(Err(payload)) => Err(TestError::Panicked(panic_message(payload))),
                Err(_) => Err(timeout_error(title, timeout)),
            }
        }
        Runnable::Callback(f) => {
            let token = CancellationToken::new();
            // Whatever way this attempt ends, later settlements are discarded.
            let _guard = token.clone().drop_guard();
            let (done, receiver) = Done::new(attempt, token);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(done))) {
                return Err(TestError::Panicked(panic_message(payload)));
            }

            match time::timeout(timeout, receiver).await {
                Ok(Ok(result)) => result.map_err(TestError::failed),
                Ok(Err(_)) => Err(TestError::DoneDropped),
                Err(_) => Err(timeout_error(title, timeout)),
            }
        }
    }
}

fn timeout_error(title: &str, timeout: Duration) -> TestError {
    TestError::Timeout {
        title: title.to_string(),
        timeout,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const T: Duration = Duration::from_millis(100);

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test]
    async fn test_sync_pass_and_fail() {
        let pass = Runnable::sync(|| Ok(()));
        assert!(run_attempt(&pass, "p", T, 1).await.is_ok());

        let fail = Runnable::sync(|| anyhow::bail!("nope"));
        let err = run_attempt(&fail, "f", T, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let sync = Runnable::sync(|| {
            assert_eq!(1 + 1, 3, "math is broken");
            Ok(())
        });
        let err = run_attempt(&sync, "s", T, 1).await.unwrap_err();
        assert!(matches!(err, TestError::Panicked(ref m) if m.contains("math is broken")));

        let future = Runnable::future(|| async {
            if true {
                panic!("async boom");
            }
            Ok(())
        });
        let err = run_attempt(&future, "f", T, 1).await.unwrap_err();
        assert!(matches!(err, TestError::Panicked(ref m) if m == "async boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_timeout_race() {
        let fast = Runnable::future(|| async {
            time::sleep(Duration::from_millis(50)).await;
            Ok(())
        });
        assert!(run_attempt(&fast, "fast", T, 1).await.is_ok());

        let slow = Runnable::future(|| async {
            time::sleep(Duration::from_millis(500)).await;
            Ok(())
        });
        let err = run_attempt(&slow, "suite slow", T, 1).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timeout of 100ms exceeded in \"suite slow\"");
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_settles_from_task() {
        let callback = Runnable::callback(|done| {
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(10)).await;
                done.pass();
            });
        });
        assert!(run_attempt(&callback, "cb", T, 1).await.is_ok());

        let failing = Runnable::callback(|done| {
            done.fail(anyhow::anyhow!("callback failed"));
        });
        let err = run_attempt(&failing, "cb", T, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "callback failed");
    }

    #[tokio::test]
    async fn test_dropped_done_fails() {
        let callback = Runnable::callback(drop);
        let err = run_attempt(&callback, "cb", T, 1).await.unwrap_err();
        assert!(matches!(err, TestError::DoneDropped));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = counter();
        let seen = calls.clone();
        let flaky = Runnable::sync(move || {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                anyhow::bail!("not yet");
            }
            Ok(())
        });

        let outcome = run_with_retries(&flaky, "flaky", T, 5).await;
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_retries_with_debug_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let calls = counter();
        let seen = calls.clone();
        let flaky = Runnable::sync(move || {
            if seen.fetch_add(1, Ordering::SeqCst) < 1 {
                anyhow::bail!("not yet");
            }
            Ok(())
        });

        let outcome = run_with_retries(&flaky, "flaky", T, u32::MAX).await;
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_make_r_plus_one_attempts() {
        let calls = counter();
        let seen = calls.clone();
        let always = Runnable::sync(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            anyhow::bail!("failure #{n}")
        });

        let outcome = run_with_retries(&always, "always", T, 2).await;
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.result.unwrap_err().to_string(), "failure #3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_rearmed_per_attempt() {
        let calls = counter();
        let seen = calls.clone();
        // Each attempt takes 80ms; cumulative timing would exceed 100ms on the second one.
        let steady = Runnable::future(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            async move {
                time::sleep(Duration::from_millis(80)).await;
                if n == 0 {
                    anyhow::bail!("first attempt fails");
                }
                Ok(())
            }
        });

        let outcome = run_with_retries(&steady, "steady", T, 1).await;
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_settlement_is_discarded() {
        let calls = counter();
        let seen = calls.clone();
        let late_results = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = late_results.clone();

        // Every attempt settles as passed, but only after the timeout.
        let late = Runnable::callback(move |done| {
            seen.fetch_add(1, Ordering::SeqCst);
            let sink = sink.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(150)).await;
                sink.lock().unwrap().push(done.pass());
            });
        });

        let outcome = run_with_retries(&late, "late", T, 1).await;
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.unwrap_err().is_timeout());

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*late_results.lock().unwrap(), vec![false, false]);
    }
}
