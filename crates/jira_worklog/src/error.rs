//! Error model shared by the dispatch core and the tracker collaborator.

use std::io;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Failures reported by the external tracker tool, split by the operation that failed.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("could not login: {0}")]
    Auth(String),
    #[error("could not list assigned issues: {0}")]
    Fetch(String),
    #[error("could not find issue {0}")]
    NotFound(String),
    #[error("could not add worklog: {0}")]
    Submit(String),
    #[error("tracker command timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to read tracker output: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

/// Errors surfaced by router actions. None of them are fatal to the process.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown issue {0}")]
    UnknownIssue(String),
    #[error("No Issue Selected")]
    NoSelection,
    #[error("Timer is not running")]
    NotRunning,
    #[error("Timer is already running")]
    AlreadyRunning,
    #[error("Cannot record a time log of < 1 minute (tracked {}s)", .elapsed.as_secs())]
    DurationTooShort { elapsed: Duration },
    #[error("Issue {0} already there!")]
    AlreadyTracked(String),
    #[error("'{0}' is not a valid issue key")]
    InvalidIssueKey(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl CoreError {
    /// Session misuse that the router's own gating should make unreachable.
    pub fn is_internal(&self) -> bool {
        matches!(self, CoreError::NotRunning | CoreError::AlreadyRunning)
    }
}
