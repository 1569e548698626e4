//! Native free-text prompts.
//!
//! The dialog plugin only offers message and file dialogs, so text entry goes
//! through `osascript` on macOS and `zenity` elsewhere on unix.

use jira_worklog::PromptRequest;
use tokio::process::Command;

/// Shows `request` and waits for the answer. `Ok(None)` means the user cancelled.
pub async fn ask_text(request: &PromptRequest) -> Result<Option<String>, String> {
    let mut command = prompt_command(request)?;
    let output = command
        .output()
        .await
        .map_err(|err| format!("Failed to open text prompt: {}", err))?;

    if output.status.success() {
        return Ok(Some(strip_line_ending(&String::from_utf8_lossy(&output.stdout))));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if is_cancellation(output.status.code(), &stderr) {
        Ok(None)
    } else {
        Err(format!("Text prompt failed: {}", stderr.trim()))
    }
}

#[cfg(target_os = "macos")]
fn prompt_command(request: &PromptRequest) -> Result<Command, String> {
    let script = format!(
        "text returned of (display dialog {} default answer {} with title {})",
        applescript_quote(&request.message),
        applescript_quote(&request.default_answer),
        applescript_quote(&request.title),
    );
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script).kill_on_drop(true);
    Ok(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn prompt_command(request: &PromptRequest) -> Result<Command, String> {
    let mut command = Command::new("zenity");
    command
        .arg("--entry")
        .arg(format!("--title={}", request.title))
        .arg(format!("--text={}", request.message))
        .arg(format!("--entry-text={}", request.default_answer))
        .kill_on_drop(true);
    Ok(command)
}

#[cfg(not(unix))]
fn prompt_command(_request: &PromptRequest) -> Result<Command, String> {
    Err("Text prompts are not supported on this platform".to_string())
}

/// osascript reports a cancelled dialog as error -128; zenity exits with 1.
fn is_cancellation(code: Option<i32>, stderr: &str) -> bool {
    if stderr.contains("(-128)") {
        return true;
    }
    cfg!(not(target_os = "macos")) && code == Some(1)
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Drops the single trailing newline the dialog tools print, keeping any other whitespace.
fn strip_line_ending(stdout: &str) -> String {
    stdout
        .strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(stdout)
        .to_string()
}
