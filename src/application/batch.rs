use std::ops::Range;
use std::path::{Path, PathBuf};

use super::download_coordinator::ItemDownloader;
use super::limiter::ConcurrencyLimiter;
use super::resolver::PlaylistResolver;
use crate::domain::{AppError, BatchResult, JobOutcome, PlaylistItem};
use crate::utils::sanitize_filename;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    pub output_dir: PathBuf,
    /// Nest output under a directory named after the playlist.
    pub title_dir: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: None,
            output_dir: PathBuf::from("."),
            title_dir: false,
        }
    }
}

/// The slice of a playlist of `len` items that a batch schedules.
pub fn select_range(len: usize, offset: usize, limit: Option<usize>) -> Range<usize> {
    let start = offset.min(len);
    let count = limit.unwrap_or(usize::MAX).min(len - start);
    start..start + count
}

/// Creates `dir` and its parents; an existing directory is fine.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Filesystem(format!("Failed to create {}: {}", dir.display(), e)))
}

pub struct BatchOrchestrator {
    downloader: ItemDownloader,
    limiter: ConcurrencyLimiter,
}

impl BatchOrchestrator {
    pub fn new(downloader: ItemDownloader, concurrency: usize) -> Result<Self, AppError> {
        Ok(Self {
            downloader,
            limiter: ConcurrencyLimiter::new(concurrency)?,
        })
    }

    /// Resolves `link` and downloads it, falling back to a single item when
    /// the link is not a playlist.
    pub async fn run_link(
        &self,
        resolver: &dyn PlaylistResolver,
        link: &str,
        options: &BatchOptions,
    ) -> Result<BatchResult, AppError> {
        match resolver.resolve_playlist(link).await {
            Ok(playlist) => {
                tracing::info!(
                    title = %playlist.title,
                    items = playlist.items.len(),
                    estimated = ?playlist.estimated_count,
                    "resolved playlist"
                );
                let output_dir = if options.title_dir {
                    options.output_dir.join(sanitize_filename(&playlist.title))
                } else {
                    options.output_dir.clone()
                };
                self.run(&playlist.items, options.offset, options.limit, &output_dir)
                    .await
            }
            Err(AppError::ResolutionNotFound(reason)) => {
                tracing::info!(link, %reason, "not a playlist, downloading as a single item");
                let item = resolver.resolve_single(link).await?;
                self.run_single(item, &options.output_dir).await
            }
            Err(e) => Err(e),
        }
    }

    /// Downloads `items[offset..offset + limit]`, at most `concurrency` at a time.
    ///
    /// Jobs are scheduled in slice order. A failed job is recorded and its
    /// siblings keep running; the result holds one entry per scheduled job, in
    /// scheduling order.
    pub async fn run(
        &self,
        items: &[PlaylistItem],
        offset: usize,
        limit: Option<usize>,
        output_dir: &Path,
    ) -> Result<BatchResult, AppError> {
        let range = select_range(items.len(), offset, limit);
        if range.is_empty() {
            tracing::info!(offset, ?limit, total = items.len(), "nothing to download");
            return Ok(BatchResult::default());
        }

        ensure_output_dir(output_dir).await?;

        let scheduled = &items[range];
        tracing::info!(
            jobs = scheduled.len(),
            concurrency = self.limiter.capacity(),
            dir = %output_dir.display(),
            "starting batch"
        );

        let mut handles = Vec::with_capacity(scheduled.len());
        for item in scheduled {
            let job = self.downloader.job_for(item.clone(), output_dir);
            let downloader = self.downloader.clone();
            let handle = self
                .limiter
                .schedule(async move { downloader.download(job).await })
                .await?;
            handles.push((item.title.clone(), handle));
        }

        let mut result = BatchResult::default();
        for (title, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(message)) => JobOutcome::Success { title, message },
                Ok(Err(error)) => JobOutcome::Failure { title, error },
                Err(join_error) => JobOutcome::Failure {
                    title,
                    error: AppError::Stream(format!("download task aborted: {}", join_error)),
                },
            };
            result.push(outcome);
        }

        tracing::info!(
            succeeded = result.succeeded(),
            failed = result.failed(),
            "batch finished"
        );
        Ok(result)
    }

    /// Downloads one item directly, without going through the limiter.
    pub async fn run_single(
        &self,
        item: PlaylistItem,
        output_dir: &Path,
    ) -> Result<BatchResult, AppError> {
        ensure_output_dir(output_dir).await?;

        let title = item.title.clone();
        let job = self.downloader.job_for(item, output_dir);
        let outcome = match self.downloader.download(job).await {
            Ok(message) => JobOutcome::Success { title, message },
            Err(error) => JobOutcome::Failure { title, error },
        };
        Ok(std::iter::once(outcome).collect())
    }
}
