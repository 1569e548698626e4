//! Presentation side of the dispatch loop: tray menu, dialogs and notifications.

use async_trait::async_trait;

use crate::registry::Issue;

/// A free-text question shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub message: String,
    pub default_answer: String,
}

impl PromptRequest {
    /// Builds a prompt pre-filled with `default_answer`.
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        default_answer: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            default_answer: default_answer.into(),
        }
    }
}

/// Commands the router issues to whatever renders the menu.
///
/// Every method except [`UiSurface::prompt`] is fire-and-forget.
#[async_trait]
pub trait UiSurface: Send + Sync {
    /// Creates the menu entry for a newly tracked issue.
    fn issue_added(&self, issue: &Issue);

    /// Shows or hides the checkmark on an issue entry.
    fn set_checked(&self, issue_key: &str, checked: bool);

    /// Text shown next to the tray icon; empty clears it.
    fn set_title(&self, title: &str);

    /// Switches the timer entry between "Start Timer" and "Stop Timer".
    fn set_timer_running(&self, running: bool);

    /// Shows a warning dialog.
    fn alert(&self, message: &str);

    /// Posts a desktop notification.
    fn notify(&self, title: &str, body: &str);

    /// Asks for text. `None` means the user cancelled.
    async fn prompt(&self, request: PromptRequest) -> Option<String>;

    /// Ends the application after the dispatch loop has stopped.
    fn exit(&self);
}
