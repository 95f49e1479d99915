//! Reporters
//!
//! Renders the event stream of a run as spec, JSON or summary output.

mod formatter;
mod reporter;

pub use formatter::{FailureEntry, OutputFormat, ResultFormatter, Tally};
pub use reporter::{JsonReporter, SpecReporter, SummaryReporter};
