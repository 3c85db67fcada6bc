//! Console rendering of sync progress and file-server access.
//!
//! Every line is prefixed with a `[HH:MM:SS]` timestamp. While a sweep is
//! running, lines go through the progress bar so they don't tear it.

use colored::*;
use futures::channel::mpsc;
use futures::StreamExt;
use hashmirror_core::protocol::{PassOutcome, SyncEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Sink {
    Stdout,
    Memory(Mutex<Vec<String>>),
}

pub struct Console {
    interval: Duration,
    bar: Mutex<Option<ProgressBar>>,
    sink: Sink,
}

impl Console {
    /// `interval` is only used to tell the user when the next check is due.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            bar: Mutex::new(None),
            sink: Sink::Stdout,
        }
    }

    /// Console that keeps lines in memory instead of printing them.
    pub fn buffered(interval: Duration) -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
            ..Self::new(interval)
        }
    }

    /// Lines captured by a buffered console.
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            Sink::Stdout => Vec::new(),
        }
    }

    pub fn line(&self, msg: impl Display) {
        let line = format!(
            "{} {}",
            chrono::Local::now().format("[%H:%M:%S]").to_string().white(),
            msg
        );
        match &self.sink {
            Sink::Stdout => match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
                Some(bar) => bar.println(line),
                None => println!("{}", line),
            },
            Sink::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
        }
    }

    pub fn banner(&self) {
        let title = format!(
            " hashmirror {}  {} ",
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_REPOSITORY")
        );
        let rule = "─".repeat(title.chars().count());
        if let Sink::Stdout = self.sink {
            println!("┌{}┐\n│{}│\n└{}┘", rule, title.bold(), rule);
        }
    }

    pub fn access(&self, ip: &str, path: &str) {
        self.line(format!(
            "{} {} {} {}",
            "Request:".green(),
            ip.yellow(),
            "->".cyan(),
            path
        ));
    }

    /// Render one sync event.
    pub fn render(&self, event: &SyncEvent) {
        match event {
            SyncEvent::SweepStarted { total } => self.start_bar(*total as u64),
            SyncEvent::FileFetching(name) => {
                self.with_bar(|bar| bar.set_message(format!("{} {}", "Updating ->".yellow(), name)));
            }
            SyncEvent::FileCurrent(_)
            | SyncEvent::FileUpdated(_)
            | SyncEvent::FileFailed { .. }
            | SyncEvent::FileRejected { .. } => {
                if let Some(text) = self.describe(event) {
                    self.line(text);
                }
                self.with_bar(|bar| bar.inc(1));
            }
            SyncEvent::RetryScheduled { .. } | SyncEvent::PassFinished(_) => {
                self.finish_bar();
                if let Some(text) = self.describe(event) {
                    self.line(text);
                }
            }
            _ => {
                if let Some(text) = self.describe(event) {
                    self.line(text);
                }
            }
        }
    }

    /// Human-readable text for an event, if it warrants a line of its own.
    pub fn describe(&self, event: &SyncEvent) -> Option<String> {
        let next = format_duration(self.interval);
        let text = match event {
            SyncEvent::PassStarted { attempt: 1 } => "Checking for resource updates..".yellow(),
            SyncEvent::PassStarted { attempt } => {
                format!("Checking for resource updates (attempt {})..", attempt).yellow()
            }
            SyncEvent::ManifestFetching { url, .. } => {
                log::debug!("fetching manifest from {}", url);
                return None;
            }
            SyncEvent::ManifestUnavailable { endpoint, error } => {
                format!("Could not fetch hashes from the {} repository: {}", endpoint, error).red()
            }
            SyncEvent::FailingOver { to, .. } => {
                format!("Switching to the {} repository and trying again", to).red()
            }
            SyncEvent::ManifestInvalid { endpoint, error } => {
                format!("Could not parse hashes from the {} repository: {}", endpoint, error).red()
            }
            SyncEvent::SweepStarted { .. } | SyncEvent::FileFetching(_) => return None,
            SyncEvent::FileCurrent(name) => {
                return Some(format!("{} {}", "Up to date ->".bright_cyan(), name))
            }
            SyncEvent::FileUpdated(name) => {
                return Some(format!("{} {}", "Updated ->".green(), name))
            }
            SyncEvent::FileFailed { name, error } => {
                return Some(format!("{} {} ({})", "Update failed ->".red(), name, error))
            }
            SyncEvent::FileRejected { name, .. } => {
                return Some(format!("{} {}", "Unsafe name skipped ->".red(), name))
            }
            SyncEvent::RetryScheduled { delay, .. } => format!(
                "Resource update not fully successful, retrying in {}",
                format_duration(*delay)
            )
            .yellow(),
            SyncEvent::PassFinished(PassOutcome::Synced(report)) => format!(
                "Resources updated ({} fetched, {} current), next check in {}",
                report.updated.len(),
                report.current.len(),
                next
            )
            .green(),
            SyncEvent::PassFinished(PassOutcome::Incomplete(report)) => format!(
                "{} files still failing after {} attempts, trying again in {}",
                report.failed.len(),
                report.attempts,
                next
            )
            .yellow(),
            SyncEvent::PassFinished(PassOutcome::ManifestUnavailable) => format!(
                "Hashes unavailable from every repository, trying again in {}",
                next
            )
            .red(),
            SyncEvent::PassFinished(PassOutcome::ManifestInvalid { .. }) => format!(
                "Hashes could not be parsed, the remote may be temporarily unavailable; trying again in {}",
                next
            )
            .red(),
            SyncEvent::TickSkipped => {
                "Previous update is still running, skipping this check".yellow()
            }
        };
        Some(text.to_string())
    }

    fn start_bar(&self, total: u64) {
        if let Sink::Memory(_) = self.sink {
            return;
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}") {
            bar.set_style(style.progress_chars("=> "));
        }
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                f(bar);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

/// Render events until every sender is gone.
pub async fn drain(console: Arc<Console>, mut events: mpsc::UnboundedReceiver<SyncEvent>) {
    while let Some(event) = events.next().await {
        console.render(&event);
    }
}

/// `24h`, `1h30m`, `45s`, `250ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{}h", h));
    }
    if m > 0 {
        out.push_str(&format!("{}m", m));
    }
    if s > 0 {
        out.push_str(&format!("{}s", s));
    }
    out
}
