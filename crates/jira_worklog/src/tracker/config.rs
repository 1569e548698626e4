use std::time::Duration;

pub const DEFAULT_JIRA_BINARY: &str = "jira";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ASSIGNED_QUERY: &str =
    "resolution = unresolved and assignee=currentuser() ORDER BY priority asc, created";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JiraCliConfig {
    pub binary: String,
    pub timeout: Duration,
    pub assigned_query: String,
}

impl Default for JiraCliConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_JIRA_BINARY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            assigned_query: DEFAULT_ASSIGNED_QUERY.to_string(),
        }
    }
}

impl JiraCliConfig {
    /// Path or name of the `jira` executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Upper bound for a single command.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// JQL used when refreshing assigned issues.
    pub fn with_assigned_query(mut self, query: impl Into<String>) -> Self {
        self.assigned_query = query.into();
        self
    }
}
