//! The single issue the next timer session will be bound to.

use crate::error::CoreError;
use crate::registry::IssueRegistry;

/// Holds at most one selected issue key. Shares the registry's lock.
#[derive(Clone, Debug)]
pub struct SelectionTracker {
    registry: IssueRegistry,
}

impl SelectionTracker {
    /// Tracks the selection stored alongside `registry`.
    pub fn new(registry: IssueRegistry) -> Self {
        Self { registry }
    }

    /// Selects `key`. Unknown keys are rejected and leave the current selection as it was.
    pub fn select(&self, key: &str) -> Result<(), CoreError> {
        let mut state = self.registry.write();
        if !state.issues.contains_key(key) {
            return Err(CoreError::UnknownIssue(key.to_string()));
        }
        state.selected = Some(key.to_string());
        Ok(())
    }

    /// Leaves no issue selected.
    pub fn clear(&self) {
        self.registry.write().selected = None;
    }

    /// Clears and then selects `key` under one write lock. An unknown key leaves nothing selected.
    pub fn reselect(&self, key: &str) -> Result<(), CoreError> {
        let mut state = self.registry.write();
        state.selected = None;
        if !state.issues.contains_key(key) {
            return Err(CoreError::UnknownIssue(key.to_string()));
        }
        state.selected = Some(key.to_string());
        Ok(())
    }

    /// Key of the selected issue, if any.
    pub fn current(&self) -> Option<String> {
        self.registry.read().selected.clone()
    }
}
