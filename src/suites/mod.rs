//! Suite files
//!
//! Test sources are compiled in, so a "file" is a named registration
//! function. Runs select files by glob over their names.

mod basic;
mod lifecycle;

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::error::SetupError;
use crate::tree::Scope;

/// A named unit of declarations
#[derive(Clone, Copy)]
pub struct SuiteFile {
    pub name: &'static str,
    pub description: &'static str,
    register: fn(&mut Scope<'_>),
}

impl SuiteFile {
    /// Declare the file's suites and hooks on `scope`
    pub fn register(&self, scope: &mut Scope<'_>) {
        debug!("Registering suite file {}", self.name);
        (self.register)(scope);
    }
}

impl std::fmt::Debug for SuiteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteFile").field("name", &self.name).finish()
    }
}

const CATALOG: &[SuiteFile] = &[
    SuiteFile {
        name: "simple-pass",
        description: "Two passing synchronous cases",
        register: basic::simple_pass,
    },
    SuiteFile {
        name: "simple-fail",
        description: "A failing assertion next to a passing case",
        register: basic::simple_fail,
    },
    SuiteFile {
        name: "timeout-fail",
        description: "A case that outlives its 100ms timeout",
        register: basic::timeout_fail,
    },
    SuiteFile {
        name: "nested-pass",
        description: "Three levels of nested suites",
        register: basic::nested_pass,
    },
    SuiteFile {
        name: "slow-pass",
        description: "Quick, medium and slow passing cases",
        register: basic::slow_pass,
    },
    SuiteFile {
        name: "hook-pass",
        description: "Checks the order of all four hook kinds",
        register: lifecycle::hook_pass,
    },
    SuiteFile {
        name: "retry-pass",
        description: "A flaky case that passes within its retries",
        register: lifecycle::retry_pass,
    },
    SuiteFile {
        name: "skip-pass",
        description: "Skipped and pending cases and suites",
        register: lifecycle::skip_pass,
    },
    SuiteFile {
        name: "callback-pass",
        description: "Cases settled through done()",
        register: lifecycle::callback_pass,
    },
    SuiteFile {
        name: "root-hooks",
        description: "Root level before/after all hooks, meant for --require",
        register: lifecycle::root_hooks,
    },
];

/// Every bundled suite file
pub fn catalog() -> &'static [SuiteFile] {
    CATALOG
}

fn matcher(pattern: &str) -> Result<GlobMatcher, SetupError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| SetupError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Files matching any of `patterns`, in pattern order then catalog order,
/// each at most once
pub fn lookup<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<&'static SuiteFile>, SetupError> {
    let mut files: Vec<&'static SuiteFile> = Vec::new();

    for pattern in patterns {
        let matcher = matcher(pattern.as_ref())?;
        for file in CATALOG.iter().filter(|f| matcher.is_match(f.name)) {
            if !files.iter().any(|f| f.name == file.name) {
                files.push(file);
            }
        }
    }

    debug!("Found {} suite files", files.len());
    Ok(files)
}

/// Resolve a `--require` entry, which must name at least one file
pub fn resolve_require(name: &str) -> Result<Vec<&'static SuiteFile>, SetupError> {
    let files = lookup(&[name])?;
    if files.is_empty() {
        return Err(SetupError::ModuleNotFound(name.to_string()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRecorder;
    use crate::executor::TestRunner;
    use crate::models::CaseState;
    use crate::runnable::HookKind;

    async fn run_files(names: &[&str]) -> (bool, TestRunner, EventRecorder) {
        let mut runner = TestRunner::new();
        let recorder = EventRecorder::new();
        runner.add_reporter(recorder.clone());

        for file in lookup(names).unwrap() {
            file.register(&mut runner.declare());
        }
        let passed = runner.run().await;
        (passed, runner, recorder)
    }

    #[test]
    fn test_lookup_order_and_dedup() {
        let files = lookup(&["simple-*", "*-pass"]).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "simple-pass",
                "simple-fail",
                "nested-pass",
                "slow-pass",
                "hook-pass",
                "retry-pass",
                "skip-pass",
                "callback-pass",
            ]
        );
    }

    #[test]
    fn test_lookup_exact_and_missing() {
        assert_eq!(lookup(&["hook-pass"]).unwrap().len(), 1);
        assert!(lookup(&["nothing-here"]).unwrap().is_empty());
        assert!(lookup::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = lookup(&["simple-[pass"]).unwrap_err();
        assert!(matches!(
            err,
            SetupError::InvalidPattern { ref pattern, .. } if pattern == "simple-[pass"
        ));
    }

    #[test]
    fn test_resolve_require() {
        assert_eq!(resolve_require("root-hooks").unwrap()[0].name, "root-hooks");
        let err = resolve_require("babel-register").unwrap_err();
        assert_eq!(err.to_string(), "module not found, babel-register");
    }

    #[tokio::test(start_paused = true)]
    async fn test_passing_files_pass() {
        for name in [
            "simple-pass",
            "nested-pass",
            "slow-pass",
            "hook-pass",
            "retry-pass",
            "skip-pass",
            "callback-pass",
        ] {
            let (passed, _, _) = run_files(&[name]).await;
            assert!(passed, "{name} should pass");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_files_fail() {
        let (passed, runner, _) = run_files(&["simple-fail"]).await;
        assert!(!passed);
        assert_eq!(runner.summary().failed, 1);

        let (passed, runner, _) = run_files(&["timeout-fail"]).await;
        assert!(!passed);
        let report = &runner.case_reports()[0];
        assert_eq!(report.state, CaseState::Failed);
        assert_eq!(
            report.error.as_deref(),
            Some("Timeout of 100ms exceeded in \"slow service answers in time\"")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_file_counts_attempts() {
        let (_, runner, _) = run_files(&["retry-pass"]).await;
        assert_eq!(runner.case_reports()[0].attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_file_reports_pending() {
        let (_, runner, recorder) = run_files(&["skip-pass"]).await;
        let summary = runner.summary();
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.pending, 3);
        assert_eq!(
            recorder.names().iter().filter(|n| **n == "pending").count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_root_hooks_run_with_files() {
        let mut runner = TestRunner::new();
        for file in resolve_require("root-hooks").unwrap() {
            file.register(&mut runner.declare());
        }
        for file in lookup(&["nested-pass"]).unwrap() {
            file.register(&mut runner.declare());
        }

        let root = runner.tree().suite(runner.tree().root()).unwrap();
        assert!(root.hook(HookKind::BeforeAll).is_some());
        assert!(runner.run().await);
        assert_eq!(runner.summary().passed, 4);
    }
}
