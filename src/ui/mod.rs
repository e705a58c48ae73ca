use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::time::Instant;

use crate::domain::ProgressState;
use crate::utils::format_megabytes;

/// Live per-job status lines, keyed by sanitized title.
///
/// Purely presentational: implementations must never fail or block a download.
pub trait ProgressReporter: Send + Sync {
    fn add(&self, key: &str, text: &str);
    fn update(&self, key: &str, text: &str);
    fn succeed(&self, key: &str, text: &str);
    fn fail(&self, key: &str, text: &str);
}

/// Running status line for one job.
pub fn render_progress_line(title: &str, state: &ProgressState, now: Instant) -> String {
    let transferred = format_megabytes(state.transferred_bytes);
    match (state.fraction(), state.remaining_minutes(now)) {
        (Some(fraction), Some(eta)) => format!(
            "{}: downloading {:.2}% ({} of {}), {:.2} minutes left",
            title,
            fraction * 100.0,
            transferred,
            format_megabytes(state.total_bytes.unwrap_or_default()),
            eta
        ),
        (Some(fraction), None) => format!(
            "{}: downloading {:.2}% ({} of {}), ETA unavailable",
            title,
            fraction * 100.0,
            transferred,
            format_megabytes(state.total_bytes.unwrap_or_default()),
        ),
        _ => format!(
            "{}: downloading ?% ({} of ?MB), ETA unavailable",
            title, transferred
        ),
    }
}

/// Renders each job as a spinner line on a shared [`MultiProgress`].
pub struct TerminalReporter {
    multi: MultiProgress,
    lines: Mutex<HashMap<String, ProgressBar>>,
    style: ProgressStyle,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(MultiProgress::new())
    }
}

impl TerminalReporter {
    pub fn new(multi: MultiProgress) -> Self {
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self {
            multi,
            lines: Mutex::new(HashMap::new()),
            style,
        }
    }

    fn with_line(&self, key: &str, apply: impl FnOnce(&ProgressBar)) {
        // A poisoned map only affects rendering, so keep using it.
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let bar = lines.entry(key.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(self.style.clone());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        apply(bar);
    }
}

impl ProgressReporter for TerminalReporter {
    fn add(&self, key: &str, text: &str) {
        self.with_line(key, |bar| bar.set_message(text.to_string()));
    }

    fn update(&self, key: &str, text: &str) {
        self.with_line(key, |bar| bar.set_message(text.to_string()));
    }

    fn succeed(&self, key: &str, text: &str) {
        self.with_line(key, |bar| bar.finish_with_message(format!("✔ {}", text)));
    }

    fn fail(&self, key: &str, text: &str) {
        self.with_line(key, |bar| bar.finish_with_message(format!("✖ {}", text)));
    }
}
