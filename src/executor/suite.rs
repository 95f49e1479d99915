//! Suite traversal
//!
//! `before all` hook, then every child in declaration order, then `after all`
//! hook. Children run strictly one after another.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::attempt;
use super::runner::TestRunner;
use crate::error::TestError;
use crate::events::EventKind;
use crate::runnable::{HookKind, Runnable};
use crate::tree::{NodeId, ROOT_TITLE};

impl TestRunner {
    /// Run a suite and everything below it.
    ///
    /// A hook failure aborts the suite's remaining work and is returned so the
    /// enclosing suites abort too. `suite end` is emitted either way.
    pub(super) fn run_suite(&mut self, id: NodeId) -> BoxFuture<'_, Result<(), TestError>> {
        async move {
            let is_root = self.tree.is_root(id);
            if !is_root {
                self.bubble(EventKind::Suite, Some(id), None);
            }

            let result = self.run_suite_body(id).await;

            if !is_root {
                self.bubble(EventKind::SuiteEnd, Some(id), None);
            }
            result
        }
        .boxed()
    }

    async fn run_suite_body(&mut self, id: NodeId) -> Result<(), TestError> {
        self.run_all_hook(id, HookKind::BeforeAll).await?;

        let children = self
            .tree
            .suite(id)
            .map(|suite| suite.children().to_vec())
            .unwrap_or_default();

        for child in children {
            if self.tree.node(child).is_case() {
                self.run_case(child).await?;
            } else {
                self.run_suite(child).await?;
            }
        }

        self.run_all_hook(id, HookKind::AfterAll).await
    }

    async fn run_all_hook(&mut self, suite: NodeId, kind: HookKind) -> Result<(), TestError> {
        let Some(hook) = self.tree.suite(suite).and_then(|s| s.hook(kind)).cloned() else {
            return Ok(());
        };

        let subject = self.hook_subject(suite);
        if let Err(error) = self.run_hook(suite, kind, &hook, &subject).await {
            self.bubble(EventKind::Fail, Some(suite), Some(&error));
            return Err(error);
        }
        Ok(())
    }

    /// Run one hook with the owning suite's timeout. Hooks are never retried.
    pub(super) async fn run_hook(
        &mut self,
        owner: NodeId,
        kind: HookKind,
        hook: &Runnable,
        subject: &str,
    ) -> Result<(), TestError> {
        let timeout = self.tree.effective_timeout(owner);
        debug!("Running \"{}\" hook for \"{}\"", kind, subject);

        match attempt::run_attempt(hook, subject, timeout, 1).await {
            Ok(()) => Ok(()),
            Err(cause) => {
                warn!("\"{}\" hook for \"{}\" failed: {}", kind, subject, cause);
                self.hook_failures += 1;
                Err(TestError::Hook {
                    kind,
                    title: subject.to_string(),
                    cause: Box::new(cause),
                })
            }
        }
    }

    fn hook_subject(&self, suite: NodeId) -> String {
        if self.tree.is_root(suite) {
            ROOT_TITLE.to_string()
        } else {
            self.tree.full_title(suite)
        }
    }
}
