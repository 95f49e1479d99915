//! Declaration-phase builder
//!
//! A [`Scope`] is the currently open suite. Registering a suite opens a child
//! scope for the duration of its builder closure, so the context stack lives in
//! the call stack instead of in shared mutable state.

use std::time::Duration;

use super::{NodeId, Tree};
use crate::runnable::{HookKind, Runnable};

/// The currently open suite during declaration
pub struct Scope<'t> {
    tree: &'t mut Tree,
    suite: NodeId,
}

impl<'t> Scope<'t> {
    pub(crate) fn new(tree: &'t mut Tree, suite: NodeId) -> Self {
        Self { tree, suite }
    }

    /// Id of the open suite
    pub fn id(&self) -> NodeId {
        self.suite
    }

    pub fn tree(&self) -> &Tree {
        &*self.tree
    }

    /// Register a child suite and declare its contents with `build`
    pub fn describe<F>(&mut self, title: impl Into<String>, build: F) -> NodeId
    where
        F: FnOnce(&mut Scope<'_>),
    {
        self.register_suite(title, build, false)
    }

    /// Register a skipped child suite. Its contents are declared but never run.
    pub fn xdescribe<F>(&mut self, title: impl Into<String>, build: F) -> NodeId
    where
        F: FnOnce(&mut Scope<'_>),
    {
        self.register_suite(title, build, true)
    }

    pub fn register_suite<F>(&mut self, title: impl Into<String>, build: F, skipped: bool) -> NodeId
    where
        F: FnOnce(&mut Scope<'_>),
    {
        let id = self.tree.add_suite(self.suite, title.into(), skipped);
        let mut child = Scope::new(&mut *self.tree, id);
        build(&mut child);
        id
    }

    /// Register a case
    pub fn it(&mut self, title: impl Into<String>, runnable: Runnable) -> CaseScope<'_> {
        self.register_case(title, Some(runnable), false)
    }

    /// Register a skipped case
    pub fn xit(&mut self, title: impl Into<String>, runnable: Runnable) -> CaseScope<'_> {
        self.register_case(title, Some(runnable), true)
    }

    /// Register a case without a body. It is reported as pending.
    pub fn pending(&mut self, title: impl Into<String>) -> CaseScope<'_> {
        self.register_case(title, None, false)
    }

    pub fn register_case(
        &mut self,
        title: impl Into<String>,
        runnable: Option<Runnable>,
        skipped: bool,
    ) -> CaseScope<'_> {
        let case = self.tree.add_case(self.suite, title.into(), runnable, skipped);
        CaseScope {
            tree: &mut *self.tree,
            case,
        }
    }

    pub fn before_all(&mut self, hook: Runnable) {
        self.hook(HookKind::BeforeAll, hook);
    }

    pub fn after_all(&mut self, hook: Runnable) {
        self.hook(HookKind::AfterAll, hook);
    }

    pub fn before_each(&mut self, hook: Runnable) {
        self.hook(HookKind::BeforeEach, hook);
    }

    pub fn after_each(&mut self, hook: Runnable) {
        self.hook(HookKind::AfterEach, hook);
    }

    /// Register a hook on the open suite; a second registration of the same kind replaces the first
    pub fn hook(&mut self, kind: HookKind, hook: Runnable) {
        self.tree.set_hook(self.suite, kind, hook);
    }

    /// Override the timeout of the open suite
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.tree.set_timeout(self.suite, timeout);
        self
    }

    /// Override the retry count of the open suite
    pub fn retries(&mut self, retries: u32) -> &mut Self {
        self.tree.set_retries(self.suite, retries);
        self
    }
}

/// The case just registered, open for per-case settings
pub struct CaseScope<'s> {
    tree: &'s mut Tree,
    case: NodeId,
}

impl CaseScope<'_> {
    pub fn id(&self) -> NodeId {
        self.case
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.tree.set_timeout(self.case, timeout);
        self
    }

    pub fn retries(self, retries: u32) -> Self {
        self.tree.set_retries(self.case, retries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaseState;

    fn noop() -> Runnable {
        Runnable::sync(|| Ok(()))
    }

    #[test]
    fn test_nested_declaration_attaches_to_open_suite() {
        let mut tree = Tree::new();
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);

        let mut inner_id = None;
        let outer = scope.describe("outer", |s| {
            s.it("first", noop());
            inner_id = Some(s.describe("inner", |s| {
                s.it("deep", noop());
            }));
            s.it("second", noop());
        });
        scope.it("top-level", noop());

        let outer_children = tree.suite(outer).unwrap().children().to_vec();
        assert_eq!(outer_children.len(), 3);
        assert_eq!(tree.node(outer_children[1]).title(), "inner");
        assert_eq!(Some(outer_children[1]), inner_id);
        assert_eq!(tree.suite(NodeId::ROOT).unwrap().children().len(), 2);

        let titles: Vec<String> = tree.cases().map(|(id, _)| tree.full_title(id)).collect();
        assert_eq!(
            titles,
            vec!["outer first", "outer inner deep", "outer second", "top-level"]
        );
    }

    #[test]
    fn test_case_scope_overrides() {
        let mut tree = Tree::new();
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);
        let case = scope
            .it("flaky", noop())
            .timeout(Duration::from_millis(20))
            .retries(3)
            .id();

        assert_eq!(tree.effective_timeout(case), Duration::from_millis(20));
        assert_eq!(tree.effective_retries(case), 3);
    }

    #[test]
    fn test_suite_scope_overrides_apply_to_children() {
        let mut tree = Tree::new();
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);
        let mut case = None;
        scope.describe("slow io", |s| {
            s.timeout(Duration::from_secs(5)).retries(1);
            case = Some(s.it("reads", noop()).id());
        });

        let case = case.unwrap();
        assert_eq!(tree.effective_timeout(case), Duration::from_secs(5));
        assert_eq!(tree.effective_retries(case), 1);
    }

    #[test]
    fn test_skip_variants() {
        let mut tree = Tree::new();
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);
        let skipped = scope.xit("skipped", noop()).id();
        let todo = scope.pending("todo").id();
        let mut nested = None;
        scope.xdescribe("off", |s| {
            nested = Some(s.it("nested", noop()).id());
        });

        assert!(tree.is_skipped(skipped));
        assert!(!tree.is_skipped(todo));
        assert!(tree.case(todo).unwrap().runnable().is_none());
        assert!(tree.is_skipped(nested.unwrap()));
        assert_eq!(tree.case(todo).unwrap().state(), CaseState::Pending);
    }

    #[test]
    fn test_hooks_register_on_open_suite() {
        let mut tree = Tree::new();
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);
        let suite = scope.describe("db", |s| {
            s.before_all(noop());
            s.after_each(noop());
        });

        let suite = tree.suite(suite).unwrap();
        assert!(suite.hook(HookKind::BeforeAll).is_some());
        assert!(suite.hook(HookKind::AfterEach).is_some());
        assert!(suite.hook(HookKind::BeforeEach).is_none());
    }
}
