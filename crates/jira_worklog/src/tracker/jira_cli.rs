//! [`TrackerApi`] backed by the `jira` command-line tool.

use std::fmt::Display;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use tokio::process::Command;
use tokio::time;
use tracing::debug;

use super::config::JiraCliConfig;
use super::models::{JiraIssue, JiraIssueList};
use super::{TrackerApi, WorklogRecord};
use crate::error::{Result, TrackerError};
use crate::registry::Issue;

const OUTPUT_TEMPLATE: &str = "debug";
const MAX_FAILURE_DETAIL: usize = 400;

/// Drives the `jira` binary, one child process per operation.
#[derive(Clone, Debug)]
pub struct JiraCli {
    config: JiraCliConfig,
}

impl JiraCli {
    /// Creates a client that spawns `config.binary` for every call.
    pub fn new(config: JiraCliConfig) -> Self {
        Self { config }
    }

    /// Settings the client was created with.
    pub fn config(&self) -> &JiraCliConfig {
        &self.config
    }

    /// Runs the binary with `args`, bounded by the configured timeout.
    async fn run(&self, args: &[String]) -> Result<Output> {
        debug!(binary = %self.config.binary, subcommand = ?args.first(), "running tracker command");
        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match time::timeout(self.config.timeout, command.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(TrackerError::Timeout(self.config.timeout)),
        }
    }
}

#[async_trait]
impl TrackerApi for JiraCli {
    async fn login(&self, username: &str) -> Result<()> {
        let output = self.run(&login_args(username)).await?;
        if !output.status.success() {
            return Err(TrackerError::Auth(describe_failure(&output)));
        }
        Ok(())
    }

    async fn list_assigned_unresolved(&self) -> Result<Vec<Issue>> {
        let output = self.run(&list_args(&self.config.assigned_query)).await?;
        if !output.status.success() {
            return Err(TrackerError::Fetch(describe_failure(&output)));
        }
        parse_issue_list(&output.stdout)
    }

    async fn get_issue(&self, key: &str) -> Result<Issue> {
        let output = self.run(&view_args(key)).await?;
        if !output.status.success() {
            debug!(issue = key, detail = %describe_failure(&output), "issue lookup failed");
            return Err(TrackerError::NotFound(key.to_string()));
        }
        parse_issue(&output.stdout)
    }

    async fn submit_worklog(&self, record: &WorklogRecord) -> Result<()> {
        if record.minutes == 0 {
            return Err(TrackerError::Submit(
                "worklog duration must be at least one minute".to_string(),
            ));
        }
        let output = self.run(&worklog_args(record)).await?;
        if !output.status.success() {
            return Err(TrackerError::Submit(describe_failure(&output)));
        }
        Ok(())
    }
}

fn login_args(username: &str) -> Vec<String> {
    vec!["login".into(), "-u".into(), username.into()]
}

fn list_args(query: &str) -> Vec<String> {
    vec![
        "list".into(),
        "--template".into(),
        OUTPUT_TEMPLATE.into(),
        "--query".into(),
        query.into(),
    ]
}

fn view_args(key: &str) -> Vec<String> {
    vec![
        "view".into(),
        key.into(),
        "--template".into(),
        OUTPUT_TEMPLATE.into(),
    ]
}

fn worklog_args(record: &WorklogRecord) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "worklog".into(),
        "add".into(),
        "--noedit".into(),
        "--template".into(),
        OUTPUT_TEMPLATE.into(),
    ];
    if let Some(message) = record
        .message
        .as_deref()
        .filter(|message| !message.trim().is_empty())
    {
        args.push("-m".into());
        args.push(message.to_string());
    }
    args.push("-S".into());
    args.push(format_jira_timestamp(&record.started_at));
    args.push("-T".into());
    args.push(format!("{}m", record.minutes));
    args.push(record.issue_key.clone());
    args
}

fn parse_issue_list(stdout: &[u8]) -> Result<Vec<Issue>> {
    let list: JiraIssueList = serde_json::from_slice(stdout)?;
    Ok(list.issues.into_iter().map(Issue::from).collect())
}

fn parse_issue(stdout: &[u8]) -> Result<Issue> {
    let issue: JiraIssue = serde_json::from_slice(stdout)?;
    Ok(issue.into())
}

/// Exit status plus whatever the tool printed, trimmed for display.
fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let detail: String = detail.chars().take(MAX_FAILURE_DETAIL).collect();
    if detail.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, detail)
    }
}

/// Formats a worklog start time as `2006-01-02T15:04:05.00-0700` (centiseconds, numeric offset).
pub fn format_jira_timestamp<Tz>(started_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let centis = (started_at.timestamp_subsec_millis() / 10).min(99);
    format!(
        "{}.{:02}{}",
        started_at.format("%Y-%m-%dT%H:%M:%S"),
        centis,
        started_at.format("%z")
    )
}
