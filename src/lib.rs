use std::sync::Arc;

use clap::Parser;
use jira_worklog::{action_channel, Action, EventRouter, JiraCli};
use log::{error, info};

mod config;
mod prompt;
mod tray;
use config::{resolve_settings, CliArgs, ConfigManager, Settings, BUILD_DEFAULT_USERNAME};
use tray::TrayMenu;

/// Reads the config file (writing defaults on first run) and merges every override.
fn load_settings(cli: &CliArgs) -> Result<Settings, String> {
    let manager = ConfigManager::new()?;
    let config = manager.load();
    if !manager.path().exists() {
        match manager.save(&config) {
            Ok(()) => info!("Wrote default config to {}", manager.path().display()),
            Err(err) => info!("Could not write default config: {}", err),
        }
    }
    resolve_settings(cli, &config, BUILD_DEFAULT_USERNAME, |key| {
        std::env::var(key).ok()
    })
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .try_init();

    // GUI launches do not inherit the login shell PATH, which is where `jira` usually lives.
    let _ = fix_path_env::fix();

    let cli = CliArgs::parse();
    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!("Startup failed: {}", err);
            std::process::exit(1);
        }
    };
    info!("Using JIRA username {}.", settings.username);

    let (actions, receiver) = action_channel();

    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            #[cfg(target_os = "macos")]
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            let tray = TrayMenu::install(app.handle(), actions.clone())?;
            let tracker = Arc::new(JiraCli::new(settings.jira));
            info!(
                "Running {} with a {}s command timeout.",
                tracker.config().binary,
                tracker.config().timeout.as_secs()
            );
            let router = EventRouter::new(settings.username, tracker, tray);

            actions.send(Action::Refresh);
            tauri::async_runtime::spawn(router.run(receiver));
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
