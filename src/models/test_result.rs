//! Test result models
//!
//! Defines case states, per-case reports and the run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run state of a case
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseState {
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl CaseState {
    pub fn symbol(&self) -> &'static str {
        match self {
            CaseState::Pending => "·",
            CaseState::Running => "…",
            CaseState::Passed => "✓",
            CaseState::Failed => "✗",
            CaseState::Skipped => "-",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseState::Passed | CaseState::Failed | CaseState::Skipped
        )
    }

}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseState::Pending => write!(f, "PENDING"),
            CaseState::Running => write!(f, "RUNNING"),
            CaseState::Passed => write!(f, "PASS"),
            CaseState::Failed => write!(f, "FAIL"),
            CaseState::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Outcome of a single case after a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseReport {
    pub full_title: String,
    pub state: CaseState,
    pub duration_ms: u64,
    pub attempts: u32,
    pub slow: bool,
    pub error: Option<String>,
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.state.symbol(),
            self.full_title,
            self.duration_ms
        )?;
        if self.attempts > 1 {
            write!(f, " ({} attempts)", self.attempts)?;
        }
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Summary of a whole run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    /// Cases left unrun because a hook aborted their suite
    pub not_run: usize,
    pub hook_failures: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new(
        started_at: Option<DateTime<Utc>>,
        reports: &[CaseReport],
        hook_failures: usize,
        duration_ms: u64,
    ) -> Self {
        let count = |state: CaseState| reports.iter().filter(|r| r.state == state).count();

        Self {
            started_at,
            total: reports.len(),
            passed: count(CaseState::Passed),
            failed: count(CaseState::Failed),
            pending: count(CaseState::Skipped),
            not_run: count(CaseState::Pending) + count(CaseState::Running),
            hook_failures,
            duration_ms,
        }
    }

    /// Percentage of executed cases that passed
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0 && self.hook_failures == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Pending: {} | Hook failures: {}",
            self.total, self.passed, self.failed, self.pending, self.hook_failures
        )?;
        if self.not_run > 0 {
            writeln!(f, "Not run: {}", self.not_run)?;
        }
        write!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.duration_ms
        )
    }
}
