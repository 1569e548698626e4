//! Contract with the external issue tracker and its `jira` CLI implementation.

mod config;
mod jira_cli;
mod models;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::Result;
use crate::registry::Issue;

pub use config::{JiraCliConfig, DEFAULT_ASSIGNED_QUERY, DEFAULT_JIRA_BINARY, DEFAULT_TIMEOUT_SECS};
pub use jira_cli::{format_jira_timestamp, JiraCli};

/// A time entry ready to be recorded against an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogRecord {
    pub issue_key: String,
    pub started_at: DateTime<Local>,
    /// Always at least one; the router rejects shorter sessions.
    pub minutes: u64,
    pub message: Option<String>,
}

/// Operations the dispatch loop needs from the tracker.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn login(&self, username: &str) -> Result<()>;

    /// Open issues assigned to the logged-in user.
    async fn list_assigned_unresolved(&self) -> Result<Vec<Issue>>;

    async fn get_issue(&self, key: &str) -> Result<Issue>;

    async fn submit_worklog(&self, record: &WorklogRecord) -> Result<()>;
}
