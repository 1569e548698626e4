//! Serialized dispatch of UI events.
//!
//! Every producer (menu clicks, the start-up refresh) pushes an [`Action`] into
//! one channel. [`EventRouter::run`] consumes it and handles each action to
//! completion before receiving the next, so registry, selection and session are
//! never mutated by two actions at once.

use std::ops::ControlFlow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::registry::{Issue, IssueRegistry};
use crate::selection::SelectionTracker;
use crate::session::{format_elapsed, TimerSession};
use crate::surface::{PromptRequest, UiSurface};
use crate::tracker::{TrackerApi, WorklogRecord};

static ISSUE_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-\d+$").expect("invalid issue key regex"));

/// Pre-filled answer of the "Issue Key?" prompt.
pub const ISSUE_KEY_PLACEHOLDER: &str = "MY-462";

/// Everything the dispatch loop can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    IssueClicked(String),
    /// Ask the user for a key, then behave like [`Action::AddIssue`].
    AddIssueRequested,
    AddIssue(String),
    Refresh,
    TimerToggle,
    Quit,
}

/// Cloneable producer half of the action queue.
#[derive(Clone, Debug)]
pub struct ActionSender {
    tx: mpsc::UnboundedSender<Action>,
}

impl ActionSender {
    /// Queues `action`. Returns false once the dispatch loop has stopped.
    pub fn send(&self, action: Action) -> bool {
        match self.tx.send(action) {
            Ok(()) => true,
            Err(err) => {
                debug!(action = ?err.0, "dispatch loop closed; dropping action");
                false
            }
        }
    }
}

pub type ActionReceiver = mpsc::UnboundedReceiver<Action>;

/// Creates the single queue all producers fan into.
pub fn action_channel() -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ActionSender { tx }, rx)
}

/// What a timer toggle ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started { issue_key: String },
    Submitted { issue_key: String, minutes: u64 },
    /// The user cancelled the worklog message prompt.
    Discarded { issue_key: String },
}

pub struct EventRouter {
    username: String,
    registry: IssueRegistry,
    selection: SelectionTracker,
    session: TimerSession,
    tracker: Arc<dyn TrackerApi>,
    ui: Arc<dyn UiSurface>,
    quit: bool,
}

impl EventRouter {
    /// Creates a router with an empty registry and an idle session.
    pub fn new(
        username: impl Into<String>,
        tracker: Arc<dyn TrackerApi>,
        ui: Arc<dyn UiSurface>,
    ) -> Self {
        let registry = IssueRegistry::new();
        let selection = SelectionTracker::new(registry.clone());
        Self {
            username: username.into(),
            registry,
            selection,
            session: TimerSession::new(),
            tracker,
            ui,
            quit: false,
        }
    }

    /// Shared handle for read-only observers.
    pub fn registry(&self) -> &IssueRegistry {
        &self.registry
    }

    /// Selection shared with the registry.
    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    /// Current timer session, running or idle.
    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    /// Consumes actions until [`Action::Quit`] or until every sender is gone.
    pub async fn run(mut self, mut actions: ActionReceiver) {
        info!("dispatch loop started");
        while let Some(action) = actions.recv().await {
            if self.dispatch(action).await.is_break() {
                break;
            }
        }
        actions.close();
        if !self.quit {
            self.on_quit().await;
        }
        info!("dispatch loop stopped");
    }

    /// Handles one action to completion. Errors are reported to the UI, never returned.
    pub async fn dispatch(&mut self, action: Action) -> ControlFlow<()> {
        if self.quit {
            debug!(?action, "ignoring action after quit");
            return ControlFlow::Break(());
        }
        debug!(?action, "dispatching action");

        let result = match action {
            Action::IssueClicked(key) => self.on_issue_clicked(&key),
            Action::AddIssueRequested => self.on_add_issue_requested().await.map(drop),
            Action::AddIssue(key) => self.on_add_issue(&key).await.map(drop),
            Action::Refresh => self.on_refresh().await.map(drop),
            Action::TimerToggle => self.on_timer_toggle().await.map(drop),
            Action::Quit => {
                self.on_quit().await;
                return ControlFlow::Break(());
            }
        };

        if let Err(err) = result {
            self.report(&err);
        }
        ControlFlow::Continue(())
    }

    /// Selects `key` and re-renders checkmarks so only it is checked.
    pub fn on_issue_clicked(&mut self, key: &str) -> Result<(), CoreError> {
        let result = self.selection.reselect(key);
        let current = self.selection.current();
        for issue in self.registry.list() {
            self.ui
                .set_checked(&issue.key, current.as_deref() == Some(issue.key.as_str()));
        }
        if result.is_ok() {
            debug!(issue = key, "issue selected");
        }
        result
    }

    /// Prompts for an issue key and adds it. `Ok(None)` when the prompt was cancelled.
    pub async fn on_add_issue_requested(&mut self) -> Result<Option<Issue>, CoreError> {
        let request = PromptRequest::new("Issue Key", "Issue Key?", ISSUE_KEY_PLACEHOLDER);
        let Some(answer) = self.ui.prompt(request).await else {
            debug!("add issue prompt cancelled");
            return Ok(None);
        };
        self.on_add_issue(&answer).await.map(Some)
    }

    /// Looks `key` up and tracks it. Nothing changes if the lookup fails.
    pub async fn on_add_issue(&mut self, key: &str) -> Result<Issue, CoreError> {
        let key = normalize_issue_key(key)?;
        if self.registry.contains(&key) {
            return Err(CoreError::AlreadyTracked(key));
        }

        self.tracker.login(&self.username).await?;
        // The tracker answers with the canonical key, which may differ in case.
        let issue = self.tracker.get_issue(&key).await?;
        if !self.track(issue.clone()) {
            return Err(CoreError::AlreadyTracked(issue.key));
        }
        info!(issue = %issue.key, "issue added");
        Ok(issue)
    }

    /// Pulls assigned open issues and adds the unknown ones. Returns how many were new.
    pub async fn on_refresh(&mut self) -> Result<usize, CoreError> {
        self.tracker.login(&self.username).await?;
        let issues = self.tracker.list_assigned_unresolved().await?;
        let fetched = issues.len();
        let added = issues
            .into_iter()
            .filter(|issue| self.track(issue.clone()))
            .count();
        info!(fetched, added, "assigned issues refreshed");
        Ok(added)
    }

    /// Starts a session on the selected issue, or stops and submits the running one.
    pub async fn on_timer_toggle(&mut self) -> Result<ToggleOutcome, CoreError> {
        if self.session.is_running() {
            self.stop_and_submit().await
        } else {
            self.start_timer()
        }
    }

    /// Stops the loop for good. A running session is stopped without submitting.
    pub async fn on_quit(&mut self) {
        self.quit = true;
        if self.session.is_running() {
            if let Ok(stopped) = self.session.stop().await {
                warn!(
                    issue = %stopped.issue_key,
                    elapsed = %format_elapsed(stopped.elapsed),
                    "quitting with an unsubmitted timer session"
                );
            }
        }
        info!("quit requested");
        self.ui.exit();
    }

    fn start_timer(&mut self) -> Result<ToggleOutcome, CoreError> {
        let ui = Arc::clone(&self.ui);
        let issue_key = self
            .session
            .start(self.selection.current(), move |elapsed| {
                ui.set_title(&format_elapsed(elapsed))
            })?
            .to_string();

        self.ui.set_timer_running(true);
        let summary = self
            .registry
            .list()
            .into_iter()
            .find(|issue| issue.key == issue_key)
            .map(|issue| issue.summary)
            .filter(|summary| !summary.trim().is_empty())
            .unwrap_or_else(|| "Tracking time from tray".to_string());
        self.ui
            .notify(&format!("Timer started: {}", issue_key), &summary);
        info!(issue = %issue_key, "timer started");
        Ok(ToggleOutcome::Started { issue_key })
    }

    async fn stop_and_submit(&mut self) -> Result<ToggleOutcome, CoreError> {
        let stopped = self.session.stop().await?;
        self.ui.set_timer_running(false);
        self.ui.set_title("");

        let elapsed = format_elapsed(stopped.elapsed);
        info!(issue = %stopped.issue_key, %elapsed, "timer stopped");
        self.ui.notify(
            &format!("Timer stopped: {}", stopped.issue_key),
            &format!("Tracked {}", elapsed),
        );

        let minutes = stopped.whole_minutes();
        if minutes < 1 {
            return Err(CoreError::DurationTooShort {
                elapsed: stopped.elapsed,
            });
        }

        let request = PromptRequest::new(
            "Worklog",
            format!("Worklog message for {} #{}", stopped.issue_key, elapsed),
            " ",
        );
        let Some(message) = self.ui.prompt(request).await else {
            info!(issue = %stopped.issue_key, "worklog discarded");
            return Ok(ToggleOutcome::Discarded {
                issue_key: stopped.issue_key,
            });
        };

        let record = WorklogRecord {
            issue_key: stopped.issue_key,
            started_at: stopped.started_at,
            minutes,
            message: Some(message.trim().to_string()).filter(|message| !message.is_empty()),
        };
        self.tracker.login(&self.username).await?;
        self.tracker.submit_worklog(&record).await?;
        info!(issue = %record.issue_key, minutes, "worklog submitted");

        Ok(ToggleOutcome::Submitted {
            issue_key: record.issue_key,
            minutes,
        })
    }

    /// Adds `issue` and creates its menu entry when it is new.
    fn track(&self, issue: Issue) -> bool {
        if !self.registry.add(issue.clone()) {
            return false;
        }
        self.ui.issue_added(&issue);
        true
    }

    fn report(&self, err: &CoreError) {
        if err.is_internal() {
            error!("action failed on session misuse: {}", err);
        } else {
            warn!("action failed: {}", err);
        }
        self.ui.alert(&err.to_string());
    }
}

/// Trims user input and checks it looks like `PROJ-123`.
pub fn normalize_issue_key(raw: &str) -> Result<String, CoreError> {
    let key = raw.trim();
    if !ISSUE_KEY_REGEX.is_match(key) {
        return Err(CoreError::InvalidIssueKey(key.to_string()));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result as TrackerResult, TrackerError};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TrackerCall {
        Login(String),
        List,
        Get(String),
        Submit { key: String, minutes: u64, message: Option<String> },
    }

    #[derive(Default)]
    struct FakeTracker {
        known: HashMap<String, String>,
        assigned: Mutex<Vec<Issue>>,
        fail_login: bool,
        calls: Mutex<Vec<TrackerCall>>,
    }

    impl FakeTracker {
        fn with_issue(mut self, key: &str, summary: &str) -> Self {
            self.known.insert(key.to_string(), summary.to_string());
            self
        }

        fn assign(&self, issues: &[(&str, &str)]) {
            *self.assigned.lock().unwrap() = issues
                .iter()
                .map(|(key, summary)| Issue::new(*key, *summary))
                .collect();
        }

        fn calls(&self) -> Vec<TrackerCall> {
            self.calls.lock().unwrap().clone()
        }

        fn submits(&self) -> Vec<TrackerCall> {
            self.calls()
                .into_iter()
                .filter(|call| matches!(call, TrackerCall::Submit { .. }))
                .collect()
        }
    }

    #[async_trait]
    impl TrackerApi for FakeTracker {
        async fn login(&self, username: &str) -> TrackerResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(TrackerCall::Login(username.to_string()));
            if self.fail_login {
                return Err(TrackerError::Auth("bad credentials".into()));
            }
            Ok(())
        }

        async fn list_assigned_unresolved(&self) -> TrackerResult<Vec<Issue>> {
            self.calls.lock().unwrap().push(TrackerCall::List);
            Ok(self.assigned.lock().unwrap().clone())
        }

        async fn get_issue(&self, key: &str) -> TrackerResult<Issue> {
            self.calls
                .lock()
                .unwrap()
                .push(TrackerCall::Get(key.to_string()));
            // Lookups ignore case and answer with the canonical key, like `jira view`.
            let canonical = key.to_ascii_uppercase();
            self.known
                .get(&canonical)
                .map(|summary| Issue::new(canonical.clone(), summary.clone()))
                .ok_or_else(|| TrackerError::NotFound(key.to_string()))
        }

        async fn submit_worklog(&self, record: &WorklogRecord) -> TrackerResult<()> {
            self.calls.lock().unwrap().push(TrackerCall::Submit {
                key: record.issue_key.clone(),
                minutes: record.minutes,
                message: record.message.clone(),
            });
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum UiEvent {
        Added(String),
        Checked(String, bool),
        Title(String),
        TimerRunning(bool),
        Alert(String),
        Notify(String),
        Prompt(String),
        Exit,
    }

    #[derive(Default)]
    struct FakeUi {
        answers: Mutex<VecDeque<Option<String>>>,
        events: Mutex<Vec<UiEvent>>,
    }

    impl FakeUi {
        fn answering(answers: &[Option<&str>]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
                events: Mutex::default(),
            }
        }

        fn record(&self, event: UiEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<UiEvent> {
            self.events.lock().unwrap().clone()
        }

        fn alerts(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    UiEvent::Alert(message) => Some(message),
                    _ => None,
                })
                .collect()
        }

        fn checked(&self) -> Vec<(String, bool)> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    UiEvent::Checked(key, checked) => Some((key, checked)),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl UiSurface for FakeUi {
        fn issue_added(&self, issue: &Issue) {
            self.record(UiEvent::Added(issue.key.clone()));
        }

        fn set_checked(&self, issue_key: &str, checked: bool) {
            self.record(UiEvent::Checked(issue_key.to_string(), checked));
        }

        fn set_title(&self, title: &str) {
            self.record(UiEvent::Title(title.to_string()));
        }

        fn set_timer_running(&self, running: bool) {
            self.record(UiEvent::TimerRunning(running));
        }

        fn alert(&self, message: &str) {
            self.record(UiEvent::Alert(message.to_string()));
        }

        fn notify(&self, title: &str, _body: &str) {
            self.record(UiEvent::Notify(title.to_string()));
        }

        async fn prompt(&self, request: PromptRequest) -> Option<String> {
            self.record(UiEvent::Prompt(request.message));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Some("Worked on it".to_string()))
        }

        fn exit(&self) {
            self.record(UiEvent::Exit);
        }
    }

    fn router(tracker: FakeTracker, ui: FakeUi) -> (EventRouter, Arc<FakeTracker>, Arc<FakeUi>) {
        let tracker = Arc::new(tracker);
        let ui = Arc::new(ui);
        let router = EventRouter::new("jdoe", tracker.clone(), ui.clone());
        (router, tracker, ui)
    }

    fn seeded(keys: &[&str]) -> (EventRouter, Arc<FakeTracker>, Arc<FakeUi>) {
        let (router, tracker, ui) = router(FakeTracker::default(), FakeUi::default());
        for key in keys {
            router.registry().add(Issue::new(*key, format!("Summary of {key}")));
        }
        (router, tracker, ui)
    }

    #[tokio::test]
    async fn add_issue_fetches_and_registers_once() {
        let (mut router, tracker, ui) =
            router(FakeTracker::default().with_issue("PROJ-1", "Fix bug"), FakeUi::default());

        let issue = router.on_add_issue("PROJ-1").await.unwrap();
        assert_eq!(issue, Issue::new("PROJ-1", "Fix bug"));
        assert_eq!(router.registry().len(), 1);

        let err = router.on_add_issue("PROJ-1").await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyTracked(ref key) if key == "PROJ-1"));
        assert_eq!(router.registry().len(), 1);

        assert_eq!(
            tracker.calls(),
            vec![
                TrackerCall::Login("jdoe".into()),
                TrackerCall::Get("PROJ-1".into())
            ]
        );
        assert_eq!(ui.events(), vec![UiEvent::Added("PROJ-1".into())]);
    }

    #[tokio::test]
    async fn add_issue_in_other_case_reports_already_tracked() {
        let (mut router, _tracker, ui) =
            router(FakeTracker::default().with_issue("PROJ-1", "Fix bug"), FakeUi::default());

        router.dispatch(Action::AddIssue("PROJ-1".into())).await;
        router.dispatch(Action::AddIssue("proj-1".into())).await;

        assert_eq!(router.registry().len(), 1);
        assert_eq!(
            ui.events(),
            vec![
                UiEvent::Added("PROJ-1".into()),
                UiEvent::Alert("Issue PROJ-1 already there!".into()),
            ]
        );
    }

    #[tokio::test]
    async fn add_issue_lookup_failure_changes_nothing() {
        let (mut router, _tracker, ui) = router(FakeTracker::default(), FakeUi::default());

        router.dispatch(Action::AddIssue("GONE-9".into())).await;

        assert!(router.registry().is_empty());
        assert_eq!(ui.alerts(), vec!["could not find issue GONE-9".to_string()]);
    }

    #[tokio::test]
    async fn add_issue_rejects_malformed_key_without_calling_tracker() {
        let (mut router, tracker, _ui) = router(FakeTracker::default(), FakeUi::default());

        let err = router.on_add_issue("not a key").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidIssueKey(_)));
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn add_issue_login_failure_is_reported() {
        let tracker = FakeTracker {
            fail_login: true,
            ..FakeTracker::default()
        }
        .with_issue("PROJ-1", "Fix bug");
        let (mut router, tracker, _ui) = router(tracker, FakeUi::default());

        let err = router.on_add_issue("PROJ-1").await.unwrap_err();
        assert!(matches!(err, CoreError::Tracker(TrackerError::Auth(_))));
        assert_eq!(tracker.calls(), vec![TrackerCall::Login("jdoe".into())]);
        assert!(router.registry().is_empty());
    }

    #[tokio::test]
    async fn add_issue_prompt_trims_answer_and_cancel_is_noop() {
        let (mut router, _tracker, ui) = router(
            FakeTracker::default().with_issue("OPS-2", "Rotate keys"),
            FakeUi::answering(&[Some("  OPS-2 \n"), None]),
        );

        let added = router.on_add_issue_requested().await.unwrap();
        assert_eq!(added.map(|issue| issue.key).as_deref(), Some("OPS-2"));

        assert!(router.on_add_issue_requested().await.unwrap().is_none());
        assert_eq!(router.registry().len(), 1);
        assert!(ui.events().contains(&UiEvent::Prompt("Issue Key?".into())));
    }

    #[tokio::test]
    async fn refresh_is_append_only_and_idempotent() {
        let (mut router, tracker, ui) = router(FakeTracker::default(), FakeUi::default());

        tracker.assign(&[("PROJ-1", "Fix bug"), ("PROJ-2", "Write docs")]);
        assert_eq!(router.on_refresh().await.unwrap(), 2);

        tracker.assign(&[("PROJ-2", "Write docs"), ("PROJ-3", "Ship it")]);
        assert_eq!(router.on_refresh().await.unwrap(), 1);

        let keys: Vec<String> = router.registry().list().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, ["PROJ-1", "PROJ-2", "PROJ-3"]);

        let added: Vec<UiEvent> = ui
            .events()
            .into_iter()
            .filter(|event| matches!(event, UiEvent::Added(_)))
            .collect();
        assert_eq!(added.len(), 3);
    }

    #[tokio::test]
    async fn click_checks_exactly_the_clicked_issue() {
        let (mut router, _tracker, ui) = seeded(&["PROJ-1", "PROJ-2", "PROJ-3"]);

        router.on_issue_clicked("PROJ-2").unwrap();

        assert_eq!(router.selection().current().as_deref(), Some("PROJ-2"));
        assert_eq!(
            ui.checked(),
            vec![
                ("PROJ-1".to_string(), false),
                ("PROJ-2".to_string(), true),
                ("PROJ-3".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn click_on_unknown_issue_clears_checks_and_selection() {
        let (mut router, _tracker, ui) = seeded(&["PROJ-1"]);
        router.on_issue_clicked("PROJ-1").unwrap();

        router.dispatch(Action::IssueClicked("NOPE-1".into())).await;

        assert!(router.selection().current().is_none());
        assert_eq!(ui.checked().last(), Some(&("PROJ-1".to_string(), false)));
        assert_eq!(ui.alerts(), vec!["Unknown issue NOPE-1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_without_selection_reports_and_stays_idle() {
        let (mut router, tracker, ui) = seeded(&["PROJ-1"]);

        let err = router.on_timer_toggle().await.unwrap_err();
        assert!(matches!(err, CoreError::NoSelection));
        assert!(!router.session().is_running());

        router.dispatch(Action::TimerToggle).await;
        assert!(!router.session().is_running());
        assert_eq!(ui.alerts(), vec!["No Issue Selected".to_string()]);
        assert!(!ui.events().contains(&UiEvent::TimerRunning(true)));
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_keeps_issue_selected_at_start() {
        let (mut router, tracker, _ui) = seeded(&["PROJ-1", "PROJ-2"]);
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();

        router.on_issue_clicked("PROJ-2").unwrap();
        time::advance(Duration::from_secs(90)).await;

        let outcome = router.on_timer_toggle().await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::Submitted {
                issue_key: "PROJ-1".into(),
                minutes: 1
            }
        );
        assert!(matches!(
            tracker.submits().as_slice(),
            [TrackerCall::Submit { key, .. }] if key == "PROJ-1"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_59_seconds_is_too_short_and_not_submitted() {
        let (mut router, tracker, ui) = seeded(&["PROJ-1"]);
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();

        time::advance(Duration::from_secs(59)).await;
        let err = router.on_timer_toggle().await.unwrap_err();

        assert!(matches!(err, CoreError::DurationTooShort { elapsed } if elapsed.as_secs() == 59));
        assert!(!router.session().is_running());
        assert!(tracker.submits().is_empty());
        assert!(!ui
            .events()
            .iter()
            .any(|event| matches!(event, UiEvent::Prompt(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_60_seconds_submits_one_minute() {
        let (mut router, tracker, _ui) = seeded(&["PROJ-1"]);
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();

        time::advance(Duration::from_secs(60)).await;
        router.on_timer_toggle().await.unwrap();

        assert_eq!(
            tracker.submits(),
            vec![TrackerCall::Submit {
                key: "PROJ-1".into(),
                minutes: 1,
                message: Some("Worked on it".into()),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_submits_rounded_minutes() {
        let (mut router, tracker, ui) = router(
            FakeTracker::default().with_issue("PROJ-1", "Fix bug"),
            FakeUi::answering(&[Some("   ")]),
        );
        router.on_add_issue("PROJ-1").await.unwrap();
        router.on_issue_clicked("PROJ-1").unwrap();

        let started = router.on_timer_toggle().await.unwrap();
        assert_eq!(started, ToggleOutcome::Started { issue_key: "PROJ-1".into() });

        time::advance(Duration::from_secs(125)).await;
        let outcome = router.on_timer_toggle().await.unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome::Submitted {
                issue_key: "PROJ-1".into(),
                minutes: 2
            }
        );
        assert_eq!(
            tracker.submits(),
            vec![TrackerCall::Submit {
                key: "PROJ-1".into(),
                minutes: 2,
                message: None,
            }]
        );
        let events = ui.events();
        assert!(events.contains(&UiEvent::Prompt("Worklog message for PROJ-1 #2m5s".into())));
        assert!(events.contains(&UiEvent::TimerRunning(false)));
        assert!(events.contains(&UiEvent::Notify("Timer stopped: PROJ-1".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_worklog_prompt_discards_session() {
        let (mut router, tracker, _ui) = router(FakeTracker::default(), FakeUi::answering(&[None]));
        router.registry().add(Issue::new("PROJ-1", "Fix bug"));
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();

        time::advance(Duration::from_secs(300)).await;
        let outcome = router.on_timer_toggle().await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Discarded { issue_key: "PROJ-1".into() });
        assert!(tracker.calls().is_empty());
        assert!(!router.session().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn running_session_updates_and_clears_title() {
        let (mut router, _tracker, ui) = seeded(&["PROJ-1"]);
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();

        time::sleep(Duration::from_millis(2500)).await;
        router.on_timer_toggle().await.unwrap_err();

        let titles: Vec<String> = ui
            .events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Title(title) => Some(title),
                _ => None,
            })
            .collect();
        assert_eq!(titles, ["1s", "2s", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_serializes_actions_and_stops_at_quit() {
        let (router, tracker, ui) = router(
            FakeTracker::default()
                .with_issue("PROJ-1", "Fix bug")
                .with_issue("PROJ-2", "Write docs"),
            FakeUi::default(),
        );
        let registry = router.registry().clone();
        let selection = router.selection().clone();
        let (sender, receiver) = action_channel();

        assert!(sender.send(Action::AddIssue("PROJ-1".into())));
        assert!(sender.send(Action::IssueClicked("PROJ-1".into())));
        assert!(sender.send(Action::TimerToggle));
        assert!(sender.send(Action::Quit));
        assert!(sender.send(Action::AddIssue("PROJ-2".into())));

        router.run(receiver).await;

        assert!(registry.contains("PROJ-1"));
        assert!(!registry.contains("PROJ-2"));
        assert_eq!(selection.current().as_deref(), Some("PROJ-1"));
        assert!(ui.events().contains(&UiEvent::TimerRunning(true)));
        assert_eq!(ui.events().last(), Some(&UiEvent::Exit));
        assert!(tracker.submits().is_empty());
        assert!(!sender.send(Action::Refresh));
    }

    #[tokio::test]
    async fn run_loop_fans_in_concurrent_producers() {
        let (router, _tracker, ui) = router(FakeTracker::default(), FakeUi::default());
        let registry = router.registry().clone();
        for n in 0..4 {
            registry.add(Issue::new(format!("PROJ-{n}"), "summary"));
        }
        let (sender, receiver) = action_channel();
        let loop_handle = tokio::spawn(router.run(receiver));

        let producers: Vec<_> = (0..4)
            .map(|n| {
                let sender = sender.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        sender.send(Action::IssueClicked(format!("PROJ-{n}")));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        sender.send(Action::Quit);
        loop_handle.await.unwrap();

        let checked = ui.checked();
        assert_eq!(checked.len(), 4 * 10 * 4);
        for click in checked.chunks(4) {
            assert_eq!(click.iter().filter(|(_, on)| *on).count(), 1);
        }
        assert!(ui.alerts().is_empty());
    }

    #[tokio::test]
    async fn dropping_every_sender_ends_the_loop() {
        let (router, _tracker, ui) = router(FakeTracker::default(), FakeUi::default());
        let (sender, receiver) = action_channel();
        drop(sender);

        router.run(receiver).await;
        assert_eq!(ui.events(), vec![UiEvent::Exit]);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_running_session_without_submitting() {
        let (mut router, tracker, ui) = seeded(&["PROJ-1"]);
        router.on_issue_clicked("PROJ-1").unwrap();
        router.on_timer_toggle().await.unwrap();
        time::advance(Duration::from_secs(600)).await;

        assert!(router.dispatch(Action::Quit).await.is_break());
        assert!(router.dispatch(Action::Refresh).await.is_break());

        assert!(!router.session().is_running());
        assert!(tracker.calls().is_empty());
        assert_eq!(ui.events().last(), Some(&UiEvent::Exit));
    }

    #[test]
    fn issue_key_normalization() {
        assert_eq!(normalize_issue_key(" PROJ-12\n").unwrap(), "PROJ-12");
        assert_eq!(normalize_issue_key("my_team2-7").unwrap(), "my_team2-7");
        assert!(normalize_issue_key("").is_err());
        assert!(normalize_issue_key("PROJ").is_err());
        assert!(normalize_issue_key("12-PROJ").is_err());
        assert!(normalize_issue_key("PROJ-1; rm -rf /").is_err());
    }
}
