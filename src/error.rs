//! Error types
//!
//! Failures produced while executing the test tree, and setup errors raised by
//! the collaborators that prepare a run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::runnable::HookKind;

/// Failure of a single attempt, a case, or a hook
#[derive(Error, Debug, Clone)]
pub enum TestError {
    /// The runnable returned an error
    #[error("{0:#}")]
    Failed(Arc<anyhow::Error>),

    /// The runnable panicked
    #[error("panicked: {0}")]
    Panicked(String),

    /// A done-callback runnable dropped its signal without settling it
    #[error("done() was dropped without being called")]
    DoneDropped,

    /// The timer fired before the runnable settled
    #[error("Timeout of {}ms exceeded in \"{title}\"", .timeout.as_millis())]
    Timeout { title: String, timeout: Duration },

    /// A lifecycle hook failed
    #[error("\"{kind}\" hook for \"{title}\": {cause}")]
    Hook {
        kind: HookKind,
        title: String,
        cause: Box<TestError>,
    },
}

impl TestError {
    /// Wrap an error returned by a runnable
    pub fn failed(error: anyhow::Error) -> Self {
        TestError::Failed(Arc::new(error))
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TestError::Timeout { .. } => true,
            TestError::Hook { cause, .. } => cause.is_timeout(),
            _ => false,
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, TestError::Hook { .. })
    }
}

impl From<anyhow::Error> for TestError {
    fn from(error: anyhow::Error) -> Self {
        TestError::failed(error)
    }
}

/// Problems found while preparing a run, before any test executes
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("No input file")]
    NoInputFiles,

    #[error("module not found, {0}")]
    ModuleNotFound(String),

    #[error("The timeout duration is invalid: \"{0}\"")]
    InvalidTimeout(String),

    #[error("The given config file is not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid file pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}
