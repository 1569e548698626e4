use serde::Deserialize;

use crate::registry::Issue;

/// Issue as printed by `jira view --template debug`.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct JiraIssue {
    pub key: String,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub(crate) struct JiraIssueFields {
    #[serde(default)]
    pub summary: Option<String>,
}

/// Envelope printed by `jira list --template debug`.
#[derive(Debug, Deserialize)]
pub(crate) struct JiraIssueList {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

impl From<JiraIssue> for Issue {
    fn from(raw: JiraIssue) -> Self {
        Issue::new(raw.key, raw.fields.summary.unwrap_or_default())
    }
}
