//! Data models for test runs
//!
//! Case states, per-case reports and run summaries.

mod test_result;

pub use test_result::{CaseReport, CaseState, RunSummary};
