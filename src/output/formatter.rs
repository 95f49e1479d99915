//! Output formatting for reporters
//!
//! Builds the lines printed by `SpecReporter` and `SummaryReporter`.

use std::time::Duration;

use crate::error::TestError;
use crate::events::NodeRef;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Spec,
    Json,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spec" => Some(OutputFormat::Spec),
            "json" | "jsonl" => Some(OutputFormat::Json),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Spec => "spec",
            OutputFormat::Json => "json",
            OutputFormat::Summary => "summary",
        }
    }
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// A failure remembered for the epilogue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureEntry {
    pub title: String,
    pub message: String,
}

impl FailureEntry {
    pub fn new(node: Option<&NodeRef<'_>>, error: Option<&TestError>) -> Self {
        let (title, message) = match error {
            Some(TestError::Hook { kind, title, cause }) => {
                (format!("\"{kind}\" hook for \"{title}\""), cause.to_string())
            }
            Some(error) => (
                node.map(|n| n.full_title()).unwrap_or_default(),
                error.to_string(),
            ),
            None => (
                node.map(|n| n.full_title()).unwrap_or_default(),
                "unknown error".to_string(),
            ),
        };
        Self { title, message }
    }
}

/// Counters kept by reporters between `start` and `end`
#[derive(Clone, Debug, Default)]
pub struct Tally {
    pub passes: usize,
    pub pending: usize,
    pub failures: Vec<FailureEntry>,
}

/// Line formatter
pub struct ResultFormatter {
    colorize: bool,
}

impl ResultFormatter {
    pub fn new() -> Self {
        Self { colorize: true }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn colorize(&self) -> bool {
        self.colorize
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colorize {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth + 1)
    }

    pub fn format_suite(&self, title: &str, depth: usize) -> String {
        format!("{}{}", Self::indent(depth.saturating_sub(1)), title)
    }

    /// `✓ title`, with the duration when it exceeds half the slow threshold
    pub fn format_pass(
        &self,
        title: &str,
        duration: Option<Duration>,
        slow: Duration,
        depth: usize,
    ) -> String {
        let mut line = format!(
            "{}{} {}",
            Self::indent(depth.saturating_sub(1)),
            self.paint(GREEN, "✓"),
            self.paint(GRAY, title)
        );

        if let Some(duration) = duration {
            let ms = duration.as_millis();
            if duration > slow {
                line.push_str(&format!(" {}", self.paint(RED, &format!("({ms}ms)"))));
            } else if duration > slow / 2 {
                line.push_str(&format!(" {}", self.paint(YELLOW, &format!("({ms}ms)"))));
            }
        }
        line
    }

    pub fn format_pending(&self, title: &str, depth: usize) -> String {
        format!(
            "{}{}",
            Self::indent(depth.saturating_sub(1)),
            self.paint(CYAN, &format!("- {title}"))
        )
    }

    pub fn format_failure(&self, number: usize, title: &str, depth: usize) -> String {
        format!(
            "{}{}",
            Self::indent(depth.saturating_sub(1)),
            self.paint(RED, &format!("{number}) {title}"))
        )
    }

    /// Counts, then the numbered failure list
    pub fn format_epilogue(&self, tally: &Tally, elapsed: Duration) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(&format!(
            "  {} {}\n",
            self.paint(GREEN, &format!("{} passing", tally.passes)),
            self.paint(GRAY, &format!("({}ms)", elapsed.as_millis()))
        ));
        if tally.pending > 0 {
            output.push_str(&format!(
                "  {}\n",
                self.paint(CYAN, &format!("{} pending", tally.pending))
            ));
        }
        if !tally.failures.is_empty() {
            output.push_str(&format!(
                "  {}\n",
                self.paint(RED, &format!("{} failing", tally.failures.len()))
            ));
        }

        for (i, failure) in tally.failures.iter().enumerate() {
            output.push('\n');
            output.push_str(&format!("  {}) {}:\n", i + 1, failure.title));
            for line in failure.message.lines() {
                output.push_str(&format!("     {}\n", self.paint(RED, line)));
            }
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}
