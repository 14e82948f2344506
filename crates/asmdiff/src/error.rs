use std::path::PathBuf;

use thiserror::Error;

/// Harness errors that abort a run.
///
/// Per-case failures are not errors; they are reported as
/// [`StageOutcome`](crate::StageOutcome) values and never stop a suite.
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing {what}: {}", path.display())]
    MissingPrecondition { what: &'static str, path: PathBuf },
    #[error("tool unavailable: {tool} ({reason})")]
    ToolingUnavailable { tool: String, reason: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingPrecondition {
            what,
            path: path.into(),
        }
    }

    pub(crate) fn tooling(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolingUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is fatal for the whole run (as opposed to bad user input).
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingPrecondition { .. } | Self::ToolingUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
