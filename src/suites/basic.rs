//! Plain pass/fail suite files

use std::time::Duration;
use tokio::time;

use crate::runnable::Runnable;
use crate::tree::Scope;

fn sleep_then_pass(ms: u64) -> Runnable {
    Runnable::future(move || async move {
        time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    })
}

pub(super) fn simple_pass(scope: &mut Scope<'_>) {
    scope.describe("arithmetic", |s| {
        s.it(
            "adds",
            Runnable::sync(|| {
                anyhow::ensure!(1 + 2 == 3, "1 + 2 should be 3");
                Ok(())
            }),
        );
        s.it(
            "multiplies",
            Runnable::sync(|| {
                anyhow::ensure!(3 * 4 == 12, "3 * 4 should be 12");
                Ok(())
            }),
        );
    });
}

pub(super) fn simple_fail(scope: &mut Scope<'_>) {
    scope.describe("arithmetic", |s| {
        s.it("adds", Runnable::sync(|| Ok(())));
        s.it(
            "compares",
            Runnable::sync(|| {
                let (left, right) = (1, 2);
                anyhow::ensure!(left == right, "expected {} to equal {}", left, right);
                Ok(())
            }),
        );
    });
}

pub(super) fn timeout_fail(scope: &mut Scope<'_>) {
    scope.describe("slow service", |s| {
        s.it("answers in time", sleep_then_pass(500))
            .timeout(Duration::from_millis(100));
    });
}

pub(super) fn nested_pass(scope: &mut Scope<'_>) {
    scope.describe("outer", |s| {
        s.it("first", Runnable::sync(|| Ok(())));
        s.describe("middle", |s| {
            s.it("second", Runnable::sync(|| Ok(())));
            s.describe("inner", |s| {
                s.it("third", sleep_then_pass(5));
            });
        });
        s.it("fourth", Runnable::sync(|| Ok(())));
    });
}

pub(super) fn slow_pass(scope: &mut Scope<'_>) {
    scope.describe("durations", |s| {
        s.it("is quick", sleep_then_pass(10));
        s.it("is medium", sleep_then_pass(60));
        s.it("is slow", sleep_then_pass(150));
    });
}
