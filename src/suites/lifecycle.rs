//! Suite files exercising hooks, retries, skipping and callbacks

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time;
use tracing::info;

use crate::runnable::Runnable;
use crate::tree::Scope;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn record(log: &Log, entry: &'static str) -> Runnable {
    let log = log.clone();
    Runnable::sync(move || {
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        Ok(())
    })
}

fn expect_log(log: &Log, expected: &'static [&'static str]) -> Runnable {
    let log = log.clone();
    Runnable::sync(move || {
        let seen = log.lock().unwrap_or_else(PoisonError::into_inner);
        anyhow::ensure!(
            seen.as_slice() == expected,
            "hooks ran as {:?}, expected {:?}",
            *seen,
            expected
        );
        Ok(())
    })
}

pub(super) fn hook_pass(scope: &mut Scope<'_>) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    scope.describe("hooks", |s| {
        s.before_all(record(&log, "before all"));
        s.before_each(record(&log, "before each"));
        s.after_each(record(&log, "after each"));
        s.after_all(record(&log, "after all"));

        s.it(
            "sees before all and before each",
            expect_log(&log, &["before all", "before each"]),
        );
        s.it(
            "sees the previous after each",
            expect_log(
                &log,
                &["before all", "before each", "after each", "before each"],
            ),
        );
    });

    scope.describe("hook results", |s| {
        s.it(
            "sees every hook of the previous suite",
            expect_log(
                &log,
                &[
                    "before all",
                    "before each",
                    "after each",
                    "before each",
                    "after each",
                    "after all",
                ],
            ),
        );
    });
}

pub(super) fn retry_pass(scope: &mut Scope<'_>) {
    let calls = Arc::new(AtomicU32::new(0));

    scope.describe("flaky", |s| {
        s.retries(2);
        s.it(
            "passes on the third attempt",
            Runnable::sync(move || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                anyhow::ensure!(attempt >= 3, "attempt {} failed", attempt);
                Ok(())
            }),
        );
    });
}

pub(super) fn skip_pass(scope: &mut Scope<'_>) {
    scope.describe("features", |s| {
        s.it("works", Runnable::sync(|| Ok(())));
        s.xit("is not ready", Runnable::sync(|| anyhow::bail!("unfinished")));
        s.pending("is planned");
    });
    scope.xdescribe("legacy", |s| {
        s.it("used to work", Runnable::sync(|| anyhow::bail!("removed")));
    });
}

pub(super) fn callback_pass(scope: &mut Scope<'_>) {
    scope.describe("callbacks", |s| {
        s.it(
            "settles from another task",
            Runnable::callback(|done| {
                tokio::spawn(async move {
                    time::sleep(Duration::from_millis(20)).await;
                    done.pass();
                });
            }),
        );
        s.it(
            "settles synchronously",
            Runnable::callback(|done| {
                done.pass();
            }),
        );
    });
}

pub(super) fn root_hooks(scope: &mut Scope<'_>) {
    scope.before_all(Runnable::sync(|| {
        info!("Global setup");
        Ok(())
    }));
    scope.after_all(Runnable::sync(|| {
        info!("Global teardown");
        Ok(())
    }));
}
