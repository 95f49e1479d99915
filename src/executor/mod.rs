//! Test execution engine
//!
//! Walks the finished tree depth-first in declaration order, one node at a time.

mod attempt;
mod case;
mod runner;
mod suite;

pub use runner::TestRunner;
