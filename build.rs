//! Build script for Tauri native target.

use std::env;

fn main() {
    // Load .env values (useful during development) before build-time macros read them
    let _ = dotenvy::dotenv();

    if let Ok(val) = env::var("JIRA_TIMER_DEFAULT_USERNAME") {
        println!("cargo:rustc-env=JIRA_TIMER_DEFAULT_USERNAME={}", val);
    }

    println!("cargo:rerun-if-env-changed=JIRA_TIMER_DEFAULT_USERNAME");
    println!("cargo:rerun-if-changed=.env");

    tauri_build::build()
}
