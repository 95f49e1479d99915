//! Lifecycle events
//!
//! Nodes never observe events themselves. Every event bubbles to the root,
//! where the runner hands it to its registered [`Reporter`]s in traversal order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::TestError;
use crate::tree::{Node, NodeId, Tree, SLOW_THRESHOLD};

/// Named lifecycle events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "end")]
    End,
    #[serde(rename = "suite")]
    Suite,
    #[serde(rename = "suite end")]
    SuiteEnd,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "test end")]
    TestEnd,
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "pending")]
    Pending,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::End => "end",
            EventKind::Suite => "suite",
            EventKind::SuiteEnd => "suite end",
            EventKind::Test => "test",
            EventKind::TestEnd => "test end",
            EventKind::Pass => "pass",
            EventKind::Fail => "fail",
            EventKind::Pending => "pending",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of the node an event originates from
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(tree: &'a Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        self.tree.node(self.id)
    }

    pub fn title(&self) -> &'a str {
        self.node().title()
    }

    pub fn full_title(&self) -> String {
        self.tree.full_title(self.id)
    }

    /// Nesting level below the root (root's children are 1)
    pub fn depth(&self) -> usize {
        self.tree.ancestors(self.id).count() - 1
    }

    pub fn is_case(&self) -> bool {
        self.node().is_case()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.node().as_case().and_then(|c| c.duration())
    }

    pub fn attempts(&self) -> u32 {
        self.node().as_case().map(|c| c.attempts()).unwrap_or(0)
    }

    /// Advisory slowness threshold
    pub fn slow(&self) -> Duration {
        SLOW_THRESHOLD
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("title", &self.title())
            .finish()
    }
}

/// An event delivered to reporters
#[derive(Clone, Copy, Debug)]
pub struct Event<'a> {
    pub kind: EventKind,
    pub node: Option<NodeRef<'a>>,
    pub error: Option<&'a TestError>,
}

impl<'a> Event<'a> {
    pub fn new(kind: EventKind, node: Option<NodeRef<'a>>, error: Option<&'a TestError>) -> Self {
        Self { kind, node, error }
    }
}

/// Observer attached to the root of the tree
pub trait Reporter: Send {
    fn on_event(&mut self, event: &Event<'_>);
}

/// Owned, serialisable form of an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Event<'_>> for EventRecord {
    fn from(event: &Event<'_>) -> Self {
        let duration_ms = match event.kind {
            EventKind::Pass | EventKind::Fail | EventKind::Pending | EventKind::TestEnd => event
                .node
                .and_then(|n| n.duration())
                .map(|d| d.as_millis() as u64),
            _ => None,
        };

        Self {
            event: event.kind,
            title: event.node.map(|n| n.title().to_string()),
            full_title: event.node.map(|n| n.full_title()),
            duration_ms,
            error: event.error.map(ToString::to_string),
        }
    }
}

/// In-memory reporter; clones share the same log
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in emission order
    pub fn names(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.event.name()).collect()
    }

    /// `"<event>"` or `"<event>:<full title>"` in emission order
    pub fn trace(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|r| match r.full_title {
                Some(title) => format!("{}:{}", r.event, title),
                None => r.event.to_string(),
            })
            .collect()
    }
}

impl Reporter for EventRecorder {
    fn on_event(&mut self, event: &Event<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EventRecord::from(event));
    }
}
