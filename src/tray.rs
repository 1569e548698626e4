//! Tray icon and menu rendering the dispatch loop's state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use jira_worklog::{Action, ActionSender, Issue, PromptRequest, UiSurface};
use log::{debug, warn};
use tauri::menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::TrayIconBuilder;
use tauri::{AppHandle, Wry};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_notification::NotificationExt;

use crate::prompt;

pub const TRAY_ID: &str = "JiraTimer";
const APP_TITLE: &str = "Jira Timer";
const MENU_QUIT_ID: &str = "tray_quit";
const MENU_TIMER_ID: &str = "tray_timer";
const MENU_ADD_ID: &str = "tray_add_issue";
const MENU_REFRESH_ID: &str = "tray_refresh";
const ISSUE_MENU_PREFIX: &str = "tray_issue::";
const START_TIMER_LABEL: &str = "Start Timer";
const STOP_TIMER_LABEL: &str = "Stop Timer";
const MAX_SUMMARY_CHARS: usize = 60;

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_text(value: &str, limit: usize) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    if limit <= 1 {
        return "…".to_string();
    }
    let mut truncated: String = trimmed.chars().take(limit - 1).collect();
    truncated.push('…');
    truncated
}

fn format_issue_label(issue: &Issue) -> String {
    let summary = collapse_whitespace(&issue.summary);
    if summary.is_empty() {
        issue.key.clone()
    } else {
        format!("{} - {}", issue.key, truncate_text(&summary, MAX_SUMMARY_CHARS))
    }
}

fn issue_menu_id(issue_key: &str) -> String {
    format!("{}{}", ISSUE_MENU_PREFIX, issue_key)
}

/// Maps a clicked menu id to the action it requests.
fn action_for_menu_id(id: &str) -> Option<Action> {
    match id {
        MENU_QUIT_ID => Some(Action::Quit),
        MENU_TIMER_ID => Some(Action::TimerToggle),
        MENU_ADD_ID => Some(Action::AddIssueRequested),
        MENU_REFRESH_ID => Some(Action::Refresh),
        _ => id
            .strip_prefix(ISSUE_MENU_PREFIX)
            .filter(|key| !key.is_empty())
            .map(|key| Action::IssueClicked(key.to_string())),
    }
}

/// Tray-backed [`UiSurface`]. Menu clicks are forwarded to the dispatch loop.
pub struct TrayMenu {
    app: AppHandle,
    menu: Menu<Wry>,
    timer_item: MenuItem<Wry>,
    issue_items: Mutex<HashMap<String, CheckMenuItem<Wry>>>,
}

impl TrayMenu {
    /// Builds the fixed menu entries and installs the tray icon.
    pub fn install(app: &AppHandle, actions: ActionSender) -> tauri::Result<Arc<Self>> {
        let quit_item = MenuItem::with_id(app, MENU_QUIT_ID, "Quit", true, None::<&str>)?;
        let timer_item =
            MenuItem::with_id(app, MENU_TIMER_ID, START_TIMER_LABEL, true, None::<&str>)?;
        let add_item = MenuItem::with_id(app, MENU_ADD_ID, "Add Issue", true, None::<&str>)?;
        let refresh_item =
            MenuItem::with_id(app, MENU_REFRESH_ID, "Refresh Assigned", true, None::<&str>)?;
        let separator = PredefinedMenuItem::separator(app)?;

        let menu = Menu::with_items(
            app,
            &[&quit_item, &timer_item, &add_item, &refresh_item, &separator],
        )?;

        let mut builder = TrayIconBuilder::with_id(TRAY_ID)
            .menu(&menu)
            .tooltip("Jira Time Tracker")
            .on_menu_event(move |_app, event| {
                match action_for_menu_id(event.id().as_ref()) {
                    Some(action) => {
                        actions.send(action);
                    }
                    None => debug!("Ignoring unknown menu id {:?}", event.id()),
                }
            });
        if let Some(icon) = app.default_window_icon() {
            builder = builder.icon(icon.clone());
        }
        builder.build(app)?;

        Ok(Arc::new(Self {
            app: app.clone(),
            menu,
            timer_item,
            issue_items: Mutex::new(HashMap::new()),
        }))
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, CheckMenuItem<Wry>>> {
        self.issue_items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UiSurface for TrayMenu {
    fn issue_added(&self, issue: &Issue) {
        let item = match CheckMenuItem::with_id(
            &self.app,
            issue_menu_id(&issue.key),
            format_issue_label(issue),
            true,
            false,
            None::<&str>,
        ) {
            Ok(item) => item,
            Err(err) => {
                warn!("Failed to create menu item for {}: {}", issue.key, err);
                return;
            }
        };
        if let Err(err) = self.menu.append(&item) {
            warn!("Failed to append menu item for {}: {}", issue.key, err);
            return;
        }
        self.items().insert(issue.key.clone(), item);
    }

    fn set_checked(&self, issue_key: &str, checked: bool) {
        if let Some(item) = self.items().get(issue_key) {
            if let Err(err) = item.set_checked(checked) {
                warn!("Failed to update checkmark for {}: {}", issue_key, err);
            }
        }
    }

    fn set_title(&self, title: &str) {
        if let Some(tray) = self.app.tray_by_id(TRAY_ID) {
            let title = Some(title).filter(|title| !title.is_empty());
            if let Err(err) = tray.set_title(title) {
                debug!("Failed to set tray title: {}", err);
            }
        }
    }

    fn set_timer_running(&self, running: bool) {
        let label = if running {
            STOP_TIMER_LABEL
        } else {
            START_TIMER_LABEL
        };
        if let Err(err) = self.timer_item.set_text(label) {
            warn!("Failed to update timer menu item: {}", err);
        }
    }

    fn alert(&self, message: &str) {
        self.app
            .dialog()
            .message(message)
            .title(APP_TITLE)
            .kind(MessageDialogKind::Warning)
            .show(|_| {});
    }

    fn notify(&self, title: &str, body: &str) {
        if let Err(err) = self
            .app
            .notification()
            .builder()
            .title(title)
            .body(body)
            .show()
        {
            warn!("Failed to show notification: {}", err);
        }
    }

    async fn prompt(&self, request: PromptRequest) -> Option<String> {
        match prompt::ask_text(&request).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!("{}", err);
                self.alert(&err);
                None
            }
        }
    }

    fn exit(&self) {
        self.app.exit(0);
    }
}
