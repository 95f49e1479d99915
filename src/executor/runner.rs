//! Test runner
//!
//! The runner is the root of the test tree. It owns the declaration entry
//! point, the reporters every event bubbles up to, and `run()`.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::TestError;
use crate::events::{Event, EventKind, NodeRef, Reporter};
use crate::models::{CaseReport, CaseState, RunSummary};
use crate::tree::{NodeId, Scope, Tree};
use crate::utils::timer::Timer;

/// Root of a test tree
pub struct TestRunner {
    pub(super) tree: Tree,
    pub(super) reporters: Vec<Box<dyn Reporter>>,
    pub(super) hook_failures: usize,
    started_at: Option<DateTime<Utc>>,
    elapsed: Option<Duration>,
    outcome: Option<bool>,
}

impl TestRunner {
    /// Create a runner with an empty root suite
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            reporters: Vec::new(),
            hook_failures: 0,
            started_at: None,
            elapsed: None,
            outcome: None,
        }
    }

    /// Open the root suite for declaration
    pub fn declare(&mut self) -> Scope<'_> {
        let root = self.tree.root();
        Scope::new(&mut self.tree, root)
    }

    /// Register a top-level suite
    pub fn describe<F>(&mut self, title: impl Into<String>, build: F) -> NodeId
    where
        F: FnOnce(&mut Scope<'_>),
    {
        self.declare().describe(title, build)
    }

    /// Register a skipped top-level suite
    pub fn xdescribe<F>(&mut self, title: impl Into<String>, build: F) -> NodeId
    where
        F: FnOnce(&mut Scope<'_>),
    {
        self.declare().xdescribe(title, build)
    }

    /// Override the timeout inherited by every node
    pub fn set_timeout(&mut self, timeout: Duration) {
        let root = self.tree.root();
        self.tree.set_timeout(root, timeout);
    }

    /// Override the retry count inherited by every node
    pub fn set_retries(&mut self, retries: u32) {
        let root = self.tree.root();
        self.tree.set_retries(root, retries);
    }

    /// Attach an observer; it receives every event of the run
    pub fn add_reporter(&mut self, reporter: impl Reporter + 'static) {
        self.reporters.push(Box::new(reporter));
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn has_run(&self) -> bool {
        self.outcome.is_some()
    }

    /// Run the whole tree and resolve to true if nothing failed.
    ///
    /// Case states are final, so a second call does not execute anything and
    /// returns the first result.
    pub async fn run(&mut self) -> bool {
        if let Some(all_passed) = self.outcome {
            warn!("Test tree already ran, returning the previous result");
            return all_passed;
        }

        let timer = Timer::start("test run");
        self.started_at = Some(Utc::now());
        info!("Starting test run with {} cases", self.tree.cases().count());

        self.bubble(EventKind::Start, None, None);
        let root = self.tree.root();
        let result = self.run_suite(root).await;
        if let Err(e) = &result {
            error!("Test run aborted: {}", e);
        }
        self.bubble(EventKind::End, None, None);

        self.elapsed = Some(timer.stop());

        let any_failed = self
            .tree
            .cases()
            .any(|(_, case)| case.state() == CaseState::Failed);
        let all_passed = result.is_ok() && self.hook_failures == 0 && !any_failed;

        let summary = self.summary();
        info!(
            "Test run completed in {}ms - Pass: {}, Fail: {}, Pending: {}, Not run: {}",
            summary.duration_ms, summary.passed, summary.failed, summary.pending, summary.not_run
        );

        self.outcome = Some(all_passed);
        all_passed
    }

    /// Per-case outcomes in traversal order
    pub fn case_reports(&self) -> Vec<CaseReport> {
        self.tree.case_reports()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.started_at,
            &self.case_reports(),
            self.hook_failures,
            self.elapsed.map(|d| d.as_millis() as u64).unwrap_or(0),
        )
    }

    /// Deliver an event originating at `origin` to the reporters on the root
    pub(super) fn bubble(
        &mut self,
        kind: EventKind,
        origin: Option<NodeId>,
        error: Option<&TestError>,
    ) {
        let Self {
            tree, reporters, ..
        } = self;
        let tree: &Tree = tree;

        let node = origin.map(|id| {
            debug_assert!(tree.is_root(tree.root_of(id)));
            NodeRef::new(tree, id)
        });
        let event = Event::new(kind, node, error);

        for reporter in reporters.iter_mut() {
            reporter.on_event(&event);
        }
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}
