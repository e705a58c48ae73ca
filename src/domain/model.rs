use std::path::{Path, PathBuf};

use tokio::time::Instant;

use super::AppError;
use crate::utils::sanitize_filename;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub title: String,
    pub url: String,
}

impl PlaylistItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Filesystem-safe form of the title, also used as the progress line key.
    pub fn sanitized_title(&self) -> String {
        sanitize_filename(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub title: String,
    pub items: Vec<PlaylistItem>,
    pub estimated_count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub item: PlaylistItem,
    pub output_path: PathBuf,
}

impl DownloadJob {
    pub fn new(item: PlaylistItem, output_dir: &Path, extension: &str) -> Self {
        let output_path = output_dir.join(format!("{}.{}", item.sanitized_title(), extension));
        Self { item, output_path }
    }

    pub fn key(&self) -> String {
        self.item.sanitized_title()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Streaming,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressState {
    pub transferred_bytes: u64,
    pub total_bytes: Option<u64>,
    pub started_at: Instant,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started_at: Instant) -> Self {
        Self {
            transferred_bytes: 0,
            total_bytes: None,
            started_at,
        }
    }

    /// Records a progress tick. Transferred bytes never move backwards.
    pub fn record(&mut self, transferred: u64, total: Option<u64>) {
        self.transferred_bytes = self.transferred_bytes.max(transferred);
        self.total_bytes = total.or(self.total_bytes);
    }

    /// Completed fraction in `0.0..=1.0`, or `None` when the total is unknown or zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some(self.transferred_bytes as f64 / total as f64),
            _ => None,
        }
    }

    /// Estimated minutes left, extrapolated from the elapsed time so far.
    pub fn remaining_minutes(&self, now: Instant) -> Option<f64> {
        let fraction = self.fraction().filter(|f| *f > 0.0)?;
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64() / 60.0;
        Some((elapsed / fraction - elapsed).max(0.0))
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success { title: String, message: String },
    Failure { title: String, error: AppError },
}

impl JobOutcome {
    pub fn title(&self) -> &str {
        match self {
            JobOutcome::Success { title, .. } | JobOutcome::Failure { title, .. } => title,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

/// Per-job outcomes in scheduling order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    outcomes: Vec<JobOutcome>,
}

impl BatchResult {
    pub fn push(&mut self, outcome: JobOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// `0` when every item succeeded, `2` when the batch finished with failures.
    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 {
            0
        } else {
            2
        }
    }
}

impl FromIterator<JobOutcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = JobOutcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
