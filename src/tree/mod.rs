//! Test tree
//!
//! The tree is an arena of [`Node`]s. A suite owns its children through its
//! ordered list of [`NodeId`]s; every node keeps a non-owning parent id used to
//! resolve skip status, timeout, retry count, full title and ancestor hooks.
//! Node ids are allocated in declaration order, so the arena order is also the
//! depth-first traversal order.

mod declare;

pub use declare::{CaseScope, Scope};

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::TestError;
use crate::models::{CaseReport, CaseState};
use crate::runnable::{HookKind, Runnable};

/// Timeout applied when no node on the path to the root overrides it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Extra attempts applied when no node on the path to the root overrides it
pub const DEFAULT_RETRIES: u32 = 0;

/// Advisory duration above which reporters flag a case as slow
pub const SLOW_THRESHOLD: Duration = Duration::from_millis(100);

/// Title of the root suite. It never shows up in full titles.
pub const ROOT_TITLE: &str = "root";

/// Index of a node inside its [`Tree`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A suite or a case
#[derive(Debug)]
pub struct Node {
    title: String,
    skipped: bool,
    parent: Option<NodeId>,
    timeout: Option<Duration>,
    retries: Option<u32>,
    kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Suite(Suite),
    Case(Case),
}

impl Node {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_suite(&self) -> Option<&Suite> {
        match &self.kind {
            NodeKind::Suite(suite) => Some(suite),
            NodeKind::Case(_) => None,
        }
    }

    pub fn as_case(&self) -> Option<&Case> {
        match &self.kind {
            NodeKind::Case(case) => Some(case),
            NodeKind::Suite(_) => None,
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self.kind, NodeKind::Case(_))
    }
}

/// Composite node: ordered children plus optional lifecycle hooks
#[derive(Debug, Default)]
pub struct Suite {
    children: Vec<NodeId>,
    hooks: Hooks,
}

impl Suite {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn hook(&self, kind: HookKind) -> Option<&Runnable> {
        self.hooks.get(kind)
    }
}

#[derive(Debug, Default)]
struct Hooks {
    before_all: Option<Runnable>,
    after_all: Option<Runnable>,
    before_each: Option<Runnable>,
    after_each: Option<Runnable>,
}

impl Hooks {
    fn slot(&mut self, kind: HookKind) -> &mut Option<Runnable> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
        }
    }

    fn get(&self, kind: HookKind) -> Option<&Runnable> {
        match kind {
            HookKind::BeforeAll => self.before_all.as_ref(),
            HookKind::AfterAll => self.after_all.as_ref(),
            HookKind::BeforeEach => self.before_each.as_ref(),
            HookKind::AfterEach => self.after_each.as_ref(),
        }
    }
}

/// Leaf node: a runnable body and its run state
#[derive(Debug, Default)]
pub struct Case {
    runnable: Option<Runnable>,
    state: CaseState,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    attempts: u32,
    error: Option<TestError>,
}

impl Case {
    pub fn runnable(&self) -> Option<&Runnable> {
        self.runnable.as_ref()
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    /// Number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Terminal error of a failed case
    pub fn error(&self) -> Option<&TestError> {
        self.error.as_ref()
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    pub fn is_slow(&self) -> bool {
        self.duration().is_some_and(|d| d > SLOW_THRESHOLD)
    }

    pub(crate) fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub(crate) fn set_running(&mut self) {
        self.state = CaseState::Running;
    }

    pub(crate) fn finish(&mut self, state: CaseState, attempts: u32, error: Option<TestError>) {
        debug_assert!(state.is_terminal());
        self.ended_at = Some(Instant::now());
        self.state = state;
        self.attempts = attempts;
        self.error = error;
    }
}

/// Arena holding every node of one test run
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree holding only the root suite
    pub fn new() -> Self {
        let root = Node {
            title: ROOT_TITLE.to_string(),
            skipped: false,
            parent: None,
            timeout: Some(DEFAULT_TIMEOUT),
            retries: Some(DEFAULT_RETRIES),
            kind: NodeKind::Suite(Suite::default()),
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.node(id).parent.is_none()
    }

    /// Iterate from `id` up to the root, `id` included
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// True if the node or any ancestor was declared skipped
    pub fn is_skipped(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.parent {
            Some(parent) => node.skipped || self.is_skipped(parent),
            None => node.skipped,
        }
    }

    /// Nearest explicit timeout on the path to the root
    pub fn effective_timeout(&self, id: NodeId) -> Duration {
        self.ancestors(id)
            .find_map(|a| self.node(a).timeout)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Nearest explicit retry count on the path to the root
    pub fn effective_retries(&self, id: NodeId) -> u32 {
        self.ancestors(id)
            .find_map(|a| self.node(a).retries)
            .unwrap_or(DEFAULT_RETRIES)
    }

    /// Space-joined titles from the root's child down to `id`.
    /// The root contributes nothing.
    pub fn full_title(&self, id: NodeId) -> String {
        let mut titles: Vec<&str> = self
            .ancestors(id)
            .filter(|a| !self.is_root(*a))
            .map(|a| self.node(a).title.as_str())
            .collect();
        titles.reverse();
        titles.join(" ")
    }

    pub fn suite(&self, id: NodeId) -> Option<&Suite> {
        self.get(id).and_then(Node::as_suite)
    }

    pub fn case(&self, id: NodeId) -> Option<&Case> {
        self.get(id).and_then(Node::as_case)
    }

    pub(crate) fn case_mut(&mut self, id: NodeId) -> Option<&mut Case> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Case(case)) => Some(case),
            _ => None,
        }
    }

    fn suite_mut(&mut self, id: NodeId) -> Option<&mut Suite> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Suite(suite)) => Some(suite),
            _ => None,
        }
    }

    /// Every case in traversal order
    pub fn cases(&self) -> impl Iterator<Item = (NodeId, &Case)> + '_ {
        self.walk()
            .into_iter()
            .filter_map(move |id| self.case(id).map(|case| (id, case)))
    }

    /// Depth-first, declaration-ordered list of node ids starting at the root
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];

        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(suite) = self.suite(id) {
                stack.extend(suite.children.iter().rev().copied());
            }
        }

        order
    }

    /// Hooks of `kind` registered on the ancestors of `case`, in invocation order:
    /// root first for `BeforeEach`, immediate parent first for `AfterEach`.
    pub fn each_hooks(&self, case: NodeId, kind: HookKind) -> Vec<(NodeId, Runnable)> {
        let mut hooks: Vec<(NodeId, Runnable)> = self
            .ancestors(case)
            .skip(1)
            .filter_map(|a| {
                self.suite(a)
                    .and_then(|s| s.hook(kind))
                    .map(|r| (a, r.clone()))
            })
            .collect();

        if kind == HookKind::BeforeEach {
            hooks.reverse();
        }
        hooks
    }

    /// Snapshot of every case, in traversal order
    pub fn case_reports(&self) -> Vec<CaseReport> {
        self.cases()
            .map(|(id, case)| CaseReport {
                full_title: self.full_title(id),
                state: case.state,
                duration_ms: case.duration().map(|d| d.as_millis() as u64).unwrap_or(0),
                attempts: case.attempts,
                slow: case.is_slow(),
                error: case.error.as_ref().map(ToString::to_string),
            })
            .collect()
    }

    pub(crate) fn add_suite(&mut self, parent: NodeId, title: String, skipped: bool) -> NodeId {
        self.push_child(parent, title, skipped, NodeKind::Suite(Suite::default()))
    }

    pub(crate) fn add_case(
        &mut self,
        parent: NodeId,
        title: String,
        runnable: Option<Runnable>,
        skipped: bool,
    ) -> NodeId {
        let case = Case {
            runnable,
            ..Case::default()
        };
        self.push_child(parent, title, skipped, NodeKind::Case(case))
    }

    fn push_child(&mut self, parent: NodeId, title: String, skipped: bool, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        debug!("Registering {} \"{}\" under {:?}", kind_name(&kind), title, parent);
        self.nodes.push(Node {
            title,
            skipped,
            parent: Some(parent),
            timeout: None,
            retries: None,
            kind,
        });
        match self.suite_mut(parent) {
            Some(suite) => suite.children.push(id),
            None => unreachable!("children can only be attached to suites"),
        }
        id
    }

    pub(crate) fn set_hook(&mut self, suite: NodeId, kind: HookKind, runnable: Runnable) {
        let title = self.full_title(suite);
        if let Some(suite) = self.suite_mut(suite) {
            if suite.hooks.slot(kind).replace(runnable).is_some() {
                warn!("\"{}\" hook of \"{}\" registered twice, keeping the last one", kind, title);
            }
        }
    }

    pub(crate) fn set_timeout(&mut self, id: NodeId, timeout: Duration) {
        self.nodes[id.0].timeout = Some(timeout);
    }

    pub(crate) fn set_retries(&mut self, id: NodeId, retries: u32) {
        self.nodes[id.0].retries = Some(retries);
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Suite(_) => "suite",
        NodeKind::Case(_) => "case",
    }
}

/// Iterator over a node and its ancestors
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}
