//! Issue selection, timer session and serialized event dispatch for the Jira tray timer.

pub mod error;
pub mod registry;
pub mod router;
pub mod selection;
pub mod session;
pub mod surface;
pub mod tracker;

pub use error::{CoreError, Result, TrackerError};
pub use registry::{Issue, IssueRegistry};
pub use router::{action_channel, Action, ActionReceiver, ActionSender, EventRouter, ToggleOutcome};
pub use selection::SelectionTracker;
pub use session::{format_elapsed, StoppedSession, TimerSession};
pub use surface::{PromptRequest, UiSurface};
pub use tracker::{JiraCli, JiraCliConfig, TrackerApi, WorklogRecord};
