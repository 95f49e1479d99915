//! Reporters
//!
//! Event-stream consumers that render progress to a writer.

use std::io::Write;
use std::time::{Duration, Instant};
use tracing::warn;

use super::formatter::{FailureEntry, ResultFormatter, Tally};
use crate::events::{Event, EventKind, EventRecord, Reporter};

fn write_out<W: Write>(out: &mut W, text: &str) {
    if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
        warn!("Failed to write report output: {}", e);
    }
}

/// Hierarchical progress output, one line per suite and case
pub struct SpecReporter<W: Write + Send> {
    out: W,
    formatter: ResultFormatter,
    tally: Tally,
    started: Option<Instant>,
}

impl<W: Write + Send> SpecReporter<W> {
    pub fn new(out: W, formatter: ResultFormatter) -> Self {
        Self {
            out,
            formatter,
            tally: Tally::default(),
            started: None,
        }
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for SpecReporter<W> {
    fn on_event(&mut self, event: &Event<'_>) {
        let depth = event.node.map(|n| n.depth()).unwrap_or(0);

        let line = match event.kind {
            EventKind::Start => {
                self.started = Some(Instant::now());
                self.tally = Tally::default();
                None
            }
            EventKind::Suite => event.node.map(|n| {
                let title = self.formatter.format_suite(n.title(), depth);
                if depth == 1 {
                    format!("\n{title}")
                } else {
                    title
                }
            }),
            EventKind::Pass => {
                self.tally.passes += 1;
                event.node.map(|n| {
                    self.formatter
                        .format_pass(n.title(), n.duration(), n.slow(), depth)
                })
            }
            EventKind::Pending => {
                self.tally.pending += 1;
                event
                    .node
                    .map(|n| self.formatter.format_pending(n.title(), depth))
            }
            EventKind::Fail => {
                let entry = FailureEntry::new(event.node.as_ref(), event.error);
                self.tally.failures.push(entry);
                let number = self.tally.failures.len();
                let title = match (event.node, event.error) {
                    (Some(n), Some(e)) if !e.is_hook() => n.title().to_string(),
                    _ => self.tally.failures[number - 1].title.clone(),
                };
                Some(self.formatter.format_failure(number, &title, depth))
            }
            EventKind::End => {
                let elapsed = self.started.map(|s| s.elapsed()).unwrap_or(Duration::ZERO);
                Some(self.formatter.format_epilogue(&self.tally, elapsed))
            }
            EventKind::SuiteEnd | EventKind::Test | EventKind::TestEnd => None,
        };

        if let Some(line) = line {
            write_out(&mut self.out, &line);
        }
    }
}

/// Counts only, printed once the run ends
pub struct SummaryReporter<W: Write + Send> {
    out: W,
    formatter: ResultFormatter,
    tally: Tally,
    started: Option<Instant>,
}

impl<W: Write + Send> SummaryReporter<W> {
    pub fn new(out: W, formatter: ResultFormatter) -> Self {
        Self {
            out,
            formatter,
            tally: Tally::default(),
            started: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for SummaryReporter<W> {
    fn on_event(&mut self, event: &Event<'_>) {
        match event.kind {
            EventKind::Start => self.started = Some(Instant::now()),
            EventKind::Pass => self.tally.passes += 1,
            EventKind::Pending => self.tally.pending += 1,
            EventKind::Fail => self
                .tally
                .failures
                .push(FailureEntry::new(event.node.as_ref(), event.error)),
            EventKind::End => {
                let elapsed = self.started.map(|s| s.elapsed()).unwrap_or(Duration::ZERO);
                let epilogue = self.formatter.format_epilogue(&self.tally, elapsed);
                write_out(&mut self.out, &epilogue);
            }
            _ => {}
        }
    }
}

/// One JSON object per event
pub struct JsonReporter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for JsonReporter<W> {
    fn on_event(&mut self, event: &Event<'_>) {
        match serde_json::to_string(&EventRecord::from(event)) {
            Ok(line) => write_out(&mut self.out, &line),
            Err(e) => warn!("Failed to serialize {} event: {}", event.kind, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TestError;
    use crate::events::NodeRef;
    use crate::runnable::Runnable;
    use crate::tree::{NodeId, Scope, Tree};

    fn sample_tree() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let mut ids = (NodeId::ROOT, NodeId::ROOT, NodeId::ROOT);
        let mut scope = Scope::new(&mut tree, NodeId::ROOT);
        ids.0 = scope.describe("math", |s| {
            ids.1 = s.it("adds", Runnable::sync(|| Ok(()))).id();
            ids.2 = s.it("divides", Runnable::sync(|| Ok(()))).id();
        });
        (tree, ids.0, ids.1, ids.2)
    }

    #[test]
    fn test_spec_reporter_output() {
        let (tree, suite, pass, fail) = sample_tree();
        let error = TestError::failed(anyhow::anyhow!("division by zero"));
        let mut reporter = SpecReporter::new(Vec::new(), ResultFormatter::new().no_color());

        let node = |id| Some(NodeRef::new(&tree, id));
        reporter.on_event(&Event::new(EventKind::Start, None, None));
        reporter.on_event(&Event::new(EventKind::Suite, node(suite), None));
        reporter.on_event(&Event::new(EventKind::Test, node(pass), None));
        reporter.on_event(&Event::new(EventKind::Pass, node(pass), None));
        reporter.on_event(&Event::new(EventKind::Fail, node(fail), Some(&error)));
        reporter.on_event(&Event::new(EventKind::SuiteEnd, node(suite), None));
        reporter.on_event(&Event::new(EventKind::End, None, None));

        assert_eq!(reporter.tally().passes, 1);
        assert_eq!(reporter.tally().failures.len(), 1);

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.starts_with("\n  math\n    ✓ adds\n    1) divides\n"));
        assert!(output.contains("1 passing"));
        assert!(output.contains("1 failing"));
        assert!(output.contains("1) math divides:\n     division by zero"));
    }

    #[test]
    fn test_json_reporter_writes_lines() {
        let (tree, _, pass, _) = sample_tree();
        let mut reporter = JsonReporter::new(Vec::new());

        reporter.on_event(&Event::new(EventKind::Start, None, None));
        reporter.on_event(&Event::new(
            EventKind::Test,
            Some(NodeRef::new(&tree, pass)),
            None,
        ));

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "start");
        assert_eq!(lines[1]["event"], "test");
        assert_eq!(lines[1]["fullTitle"], "math adds");
    }

    #[test]
    fn test_summary_reporter_prints_only_at_end() {
        let (tree, _, pass, _) = sample_tree();
        let mut reporter = SummaryReporter::new(Vec::new(), ResultFormatter::new().no_color());

        reporter.on_event(&Event::new(EventKind::Start, None, None));
        reporter.on_event(&Event::new(
            EventKind::Pass,
            Some(NodeRef::new(&tree, pass)),
            None,
        ));
        reporter.on_event(&Event::new(
            EventKind::Pending,
            Some(NodeRef::new(&tree, pass)),
            None,
        ));
        assert!(reporter.out.is_empty());

        reporter.on_event(&Event::new(EventKind::End, None, None));
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.contains("1 passing"));
        assert!(output.contains("1 pending"));
        assert!(!output.contains("failing"));
    }
}
