//! Case run state machine
//!
//! `Pending -> Skipped`, or `Pending -> Running -> Passed | Failed`.

use tracing::debug;

use super::attempt;
use super::runner::TestRunner;
use crate::error::TestError;
use crate::events::EventKind;
use crate::models::CaseState;
use crate::runnable::HookKind;
use crate::tree::NodeId;

impl TestRunner {
    /// Run one case together with the `beforeEach`/`afterEach` hooks of its ancestors.
    ///
    /// Case failures are absorbed into the case state. Only hook failures come
    /// back as `Err`.
    pub(super) async fn run_case(&mut self, id: NodeId) -> Result<(), TestError> {
        let runnable = match self.tree.case_mut(id) {
            Some(case) => {
                case.start();
                case.runnable().cloned()
            }
            None => return Ok(()),
        };

        let runnable = match runnable {
            Some(runnable) if !self.tree.is_skipped(id) => runnable,
            _ => {
                self.skip_case(id);
                return Ok(());
            }
        };

        if let Some(case) = self.tree.case_mut(id) {
            case.set_running();
        }
        self.bubble(EventKind::Test, Some(id), None);

        if let Err(error) = self.run_each_hooks(id, HookKind::BeforeEach).await {
            self.finish_case(id, Err(error.clone()), 0);
            return Err(error);
        }

        let title = self.tree.full_title(id);
        let timeout = self.tree.effective_timeout(id);
        let retries = self.tree.effective_retries(id);
        debug!(
            "Running \"{}\" ({}, timeout {}ms, {} retries)",
            title,
            runnable.shape(),
            timeout.as_millis(),
            retries
        );

        let outcome = attempt::run_with_retries(&runnable, &title, timeout, retries).await;
        self.finish_case(id, outcome.result, outcome.attempts);

        if let Err(error) = self.run_each_hooks(id, HookKind::AfterEach).await {
            self.bubble(EventKind::Fail, Some(id), Some(&error));
            return Err(error);
        }

        Ok(())
    }

    fn skip_case(&mut self, id: NodeId) {
        if let Some(case) = self.tree.case_mut(id) {
            case.finish(CaseState::Skipped, 0, None);
        }
        self.bubble(EventKind::Pending, Some(id), None);
        self.bubble(EventKind::TestEnd, Some(id), None);
    }

    fn finish_case(&mut self, id: NodeId, result: Result<(), TestError>, attempts: u32) {
        match result {
            Ok(()) => {
                if let Some(case) = self.tree.case_mut(id) {
                    case.finish(CaseState::Passed, attempts, None);
                }
                self.bubble(EventKind::Pass, Some(id), None);
            }
            Err(error) => {
                if let Some(case) = self.tree.case_mut(id) {
                    case.finish(CaseState::Failed, attempts, Some(error.clone()));
                }
                self.bubble(EventKind::Fail, Some(id), Some(&error));
            }
        }
        self.bubble(EventKind::TestEnd, Some(id), None);
    }

    /// Invoke the `kind` hooks of every ancestor of `case`
    async fn run_each_hooks(&mut self, case: NodeId, kind: HookKind) -> Result<(), TestError> {
        let subject = self.tree.full_title(case);
        for (owner, hook) in self.tree.each_hooks(case, kind) {
            self.run_hook(owner, kind, &hook, &subject).await?;
        }
        Ok(())
    }
}
