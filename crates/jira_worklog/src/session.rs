//! Timer state machine used for issue time tracking.
//!
//! A session is `Idle` until started against a selected issue. While running it
//! owns its own copy of the issue key, so later selection changes do not move the
//! time to another issue.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::CoreError;

/// Cadence of the elapsed-time display.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Result of stopping a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedSession {
    pub issue_key: String,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl StoppedSession {
    /// Elapsed time truncated to whole minutes.
    pub fn whole_minutes(&self) -> u64 {
        self.elapsed.as_secs() / 60
    }
}

struct Running {
    issue_key: String,
    started: Instant,
    started_at: DateTime<Local>,
    ticker: JoinHandle<()>,
}

/// Single stopwatch owned by the dispatch loop.
#[derive(Default)]
pub struct TimerSession {
    running: Option<Running>,
}

impl TimerSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// True between a successful `start` and the matching `stop`.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Issue key captured when the running session started.
    pub fn issue_key(&self) -> Option<&str> {
        self.running.as_ref().map(|running| running.issue_key.as_str())
    }

    /// Time since the running session started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.running.as_ref().map(|running| running.started.elapsed())
    }

    /// Starts timing `selection` and schedules `on_tick` once per second.
    ///
    /// Must be called from within a tokio runtime. `on_tick` only receives the
    /// elapsed time; it has no access to the session.
    pub fn start<F>(&mut self, selection: Option<String>, on_tick: F) -> Result<&str, CoreError>
    where
        F: Fn(Duration) + Send + 'static,
    {
        if self.running.is_some() {
            return Err(CoreError::AlreadyRunning);
        }
        let issue_key = selection.ok_or(CoreError::NoSelection)?;

        let started = Instant::now();
        let ticker = spawn_ticker(started, on_tick);
        debug!(issue = %issue_key, "timer session started");

        let running = self.running.insert(Running {
            issue_key,
            started,
            started_at: Local::now(),
            ticker,
        });
        Ok(running.issue_key.as_str())
    }

    /// Stops the session. Returns only once the ticker has finished, so no
    /// `on_tick` call can run after this resolves.
    pub async fn stop(&mut self) -> Result<StoppedSession, CoreError> {
        let running = self.running.take().ok_or(CoreError::NotRunning)?;
        let elapsed = running.started.elapsed();

        running.ticker.abort();
        // A tick already inside `on_tick` on another worker completes first.
        let _ = running.ticker.await;
        debug!(issue = %running.issue_key, elapsed_secs = elapsed.as_secs(), "timer session stopped");

        Ok(StoppedSession {
            issue_key: running.issue_key,
            started_at: running.started_at,
            elapsed,
        })
    }
}

impl Drop for TimerSession {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.ticker.abort();
        }
    }
}

fn spawn_ticker<F>(started: Instant, on_tick: F) -> JoinHandle<()>
where
    F: Fn(Duration) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticks = time::interval_at(started + TICK_INTERVAL, TICK_INTERVAL);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            on_tick(started.elapsed());
        }
    })
}

/// Formats a duration rounded to whole seconds, e.g. `45s`, `2m5s`, `1h0m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = (elapsed.as_millis() + 500) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
