//! Error types for appinstaller-core

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Installer errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {subject}: {reason}")]
    Validation { subject: String, reason: String },

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("all extraction methods failed for {}: {}", bundle.display(), summarize(attempts))]
    Extraction {
        bundle: PathBuf,
        attempts: Vec<StrategyFailure>,
    },

    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Which lookup came up empty.
#[derive(Debug, thiserror::Error)]
pub enum NotFound {
    #[error("category {0} not found")]
    Category(String),

    #[error("parameter {key} not found in category {category}")]
    Key { category: String, key: String },

    #[error("no desktop file found under {}", .0.display())]
    Descriptor(PathBuf),

    #[error("no icon found: {0}")]
    Icon(String),

    #[error("application not found: {0}")]
    Application(String),
}

/// External process failures
#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("failed to start `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("`{program}` timed out after {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("`{program}` was cancelled")]
    Cancelled { program: String },
}

/// One extraction strategy's reason for giving up.
#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

fn summarize(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.strategy, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Adapter for `map_err` that attaches a context and the offending path.
    pub fn io(context: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Error {
        let path = path.to_path_buf();
        move |source| Error::Io {
            context,
            path,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
