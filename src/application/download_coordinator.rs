use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use super::resolver::MediaResolver;
use crate::{
    domain::{AppError, DownloadJob, JobState, PlaylistItem, ProgressState},
    ui::{render_progress_line, ProgressReporter},
};

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started { total: Option<u64> },
    Progress { transferred: u64, total: Option<u64> },
    Completed(PathBuf),
    Failed(AppError),
}

/// Drives one media stream into one file and reports on it.
#[derive(Clone)]
pub struct ItemDownloader {
    media: Arc<dyn MediaResolver>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ItemDownloader {
    pub fn new(media: Arc<dyn MediaResolver>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { media, reporter }
    }

    pub fn job_for(&self, item: PlaylistItem, output_dir: &Path) -> DownloadJob {
        DownloadJob::new(item, output_dir, self.media.container())
    }

    /// Runs `job` to a terminal state.
    ///
    /// Every error ends up as the returned `Err` and on the job's progress
    /// line; nothing here panics or aborts sibling jobs.
    pub async fn download(&self, job: DownloadJob) -> Result<String, AppError> {
        let key = job.key();
        let title = job.item.title.clone();
        let mut state = JobState::Pending;
        let mut progress = ProgressState::new();

        self.reporter.add(&key, &format!("{}: starting", title));

        let mut events = self.download_stream(job.item.url.clone(), job.output_path.clone());
        while let Some(event) = events.next().await {
            match event {
                DownloadEvent::Started { total } => {
                    state = advance(&title, state, JobState::Streaming);
                    progress = ProgressState::new();
                    progress.record(0, total);
                    self.reporter
                        .update(&key, &render_progress_line(&title, &progress, Instant::now()));
                }
                DownloadEvent::Progress { transferred, total } => {
                    progress.record(transferred, total);
                    self.reporter
                        .update(&key, &render_progress_line(&title, &progress, Instant::now()));
                }
                DownloadEvent::Completed(path) => {
                    advance(&title, state, JobState::Succeeded);
                    let message = format!("{}: saved to {}", title, path.display());
                    self.reporter.succeed(&key, &message);
                    return Ok(message);
                }
                DownloadEvent::Failed(error) => {
                    advance(&title, state, JobState::Failed);
                    tracing::warn!(title = %title, error = %error, "download failed");
                    self.reporter.fail(&key, &format!("{}: {}", title, error));
                    return Err(error);
                }
            }
        }

        let error = AppError::Stream("download ended without a result".to_string());
        self.reporter.fail(&key, &format!("{}: {}", title, error));
        Err(error)
    }

    pub fn download_stream(&self, url: String, path: PathBuf) -> BoxStream<'static, DownloadEvent> {
        futures::stream::unfold(
            DownloadRuntimeState::Start {
                media: self.media.clone(),
                url,
                path,
            },
            |state| async move {
                match state {
                    DownloadRuntimeState::Start { media, url, path } => {
                        let opened = match media.open(&url).await {
                            Ok(opened) => opened,
                            Err(e) => {
                                return Some((
                                    DownloadEvent::Failed(e),
                                    DownloadRuntimeState::Finished,
                                ));
                            }
                        };

                        match tokio::fs::File::create(&path).await {
                            Ok(file) => Some((
                                DownloadEvent::Started {
                                    total: opened.total_bytes,
                                },
                                DownloadRuntimeState::Downloading {
                                    file,
                                    stream: opened.chunks,
                                    downloaded: 0,
                                    total: opened.total_bytes,
                                    path,
                                },
                            )),
                            Err(e) => Some((
                                DownloadEvent::Failed(AppError::Filesystem(format!(
                                    "Failed to create {}: {}",
                                    path.display(),
                                    e
                                ))),
                                DownloadRuntimeState::Finished,
                            )),
                        }
                    }
                    DownloadRuntimeState::Downloading {
                        mut file,
                        mut stream,
                        mut downloaded,
                        total,
                        path,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                return Some((
                                    DownloadEvent::Failed(AppError::Filesystem(format!(
                                        "Write error: {}",
                                        e
                                    ))),
                                    DownloadRuntimeState::Finished,
                                ));
                            }

                            downloaded += chunk.len() as u64;

                            Some((
                                DownloadEvent::Progress {
                                    transferred: downloaded,
                                    total,
                                },
                                DownloadRuntimeState::Downloading {
                                    file,
                                    stream,
                                    downloaded,
                                    total,
                                    path,
                                },
                            ))
                        }
                        Some(Err(e)) => Some((DownloadEvent::Failed(e), DownloadRuntimeState::Finished)),
                        None => {
                            if let Err(e) = finish_file(&mut file).await {
                                return Some((
                                    DownloadEvent::Failed(AppError::Filesystem(format!(
                                        "Failed to sync file: {}",
                                        e
                                    ))),
                                    DownloadRuntimeState::Finished,
                                ));
                            }

                            Some((
                                DownloadEvent::Completed(path),
                                DownloadRuntimeState::Finished,
                            ))
                        }
                    },
                    DownloadRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

async fn finish_file(file: &mut tokio::fs::File) -> std::io::Result<()> {
    file.flush().await?;
    file.sync_all().await
}

fn advance(title: &str, from: JobState, to: JobState) -> JobState {
    debug_assert!(!from.is_terminal(), "job {} left terminal state", title);
    tracing::debug!(title, ?from, ?to, "job state");
    to
}

enum DownloadRuntimeState {
    Start {
        media: Arc<dyn MediaResolver>,
        url: String,
        path: PathBuf,
    },
    Downloading {
        file: tokio::fs::File,
        stream: BoxStream<'static, Result<bytes::Bytes, AppError>>,
        downloaded: u64,
        total: Option<u64>,
        path: PathBuf,
    },
    Finished,
}
