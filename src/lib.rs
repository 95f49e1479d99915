//! kocha - a minimal async test runner
//!
//! Tests are declared as a tree of suites and cases, then run strictly in
//! declaration order with `before all`/`after all`/`before each`/`after each`
//! hooks, per-node timeouts and retries. Progress is delivered as events to
//! reporters attached to the runner.
//!
//! ```no_run
//! use kocha::{Runnable, TestRunner};
//!
//! # async fn demo() {
//! let mut runner = TestRunner::new();
//! runner.describe("math", |s| {
//!     s.it("adds", Runnable::sync(|| {
//!         anyhow::ensure!(1 + 1 == 2);
//!         Ok(())
//!     }));
//! });
//! let all_passed = runner.run().await;
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod models;
pub mod output;
pub mod runnable;
pub mod suites;
pub mod tree;
pub mod utils;

pub use error::{SetupError, TestError};
pub use events::{Event, EventKind, EventRecord, EventRecorder, NodeRef, Reporter};
pub use executor::TestRunner;
pub use models::{CaseReport, CaseState, RunSummary};
pub use runnable::{Done, HookKind, Runnable};
pub use tree::{CaseScope, NodeId, Scope, Tree};
