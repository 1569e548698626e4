//! In-memory set of tracked issues.
//!
//! The registry and the current selection live behind a single lock so a click
//! that re-selects an issue can never be observed half-applied.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A tracker ticket known to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: String,
    pub summary: String,
}

impl Issue {
    /// Creates an issue from its key and one-line summary.
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
        }
    }
}

/// State guarded by the shared lock.
#[derive(Debug, Default)]
pub(crate) struct BoardState {
    pub(crate) issues: HashMap<String, Issue>,
    pub(crate) selected: Option<String>,
}

/// Append-only registry of issues keyed by issue key. Cloning shares the same storage.
#[derive(Clone, Default, Debug)]
pub struct IssueRegistry {
    state: Arc<RwLock<BoardState>>,
}

impl IssueRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when an issue with `key` has been added.
    pub fn contains(&self, key: &str) -> bool {
        self.read().issues.contains_key(key)
    }

    /// Inserts `issue` unless its key is already present. Returns whether it was newly added.
    pub fn add(&self, issue: Issue) -> bool {
        let mut state = self.write();
        if state.issues.contains_key(&issue.key) {
            return false;
        }
        state.issues.insert(issue.key.clone(), issue);
        true
    }

    /// Snapshot of every known issue, sorted by key.
    pub fn list(&self) -> Vec<Issue> {
        let state = self.read();
        let mut issues: Vec<Issue> = state.issues.values().cloned().collect();
        drop(state);
        issues.sort_by(|a, b| a.key.cmp(&b.key));
        issues
    }

    /// Number of distinct issue keys.
    pub fn len(&self) -> usize {
        self.read().issues.len()
    }

    /// True until the first issue is added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
