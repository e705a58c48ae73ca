//! Scripted collaborators for exercising the download core without yt-dlp.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::resolver::{MediaResolver, MediaStream, PlaylistResolver};
use crate::domain::{AppError, Playlist, PlaylistItem};

#[derive(Clone)]
pub enum Script {
    Chunks {
        chunks: Vec<Vec<u8>>,
        total: Option<u64>,
    },
    OpenError(AppError),
    FailAfter {
        chunks: Vec<Vec<u8>>,
        error: AppError,
    },
}

impl Script {
    pub fn chunks(chunks: Vec<Vec<u8>>, total: Option<u64>) -> Self {
        Script::Chunks { chunks, total }
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serves scripted byte streams; unknown URLs get a small default stream.
pub struct FakeMedia {
    scripts: HashMap<String, Script>,
    chunk_delay: Duration,
    active: Arc<AtomicUsize>,
    pub peak: AtomicUsize,
    pub opened: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            chunk_delay: Duration::ZERO,
            active: Arc::new(AtomicUsize::new(0)),
            peak: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaResolver for FakeMedia {
    fn container(&self) -> &str {
        "mp4"
    }

    async fn open(&self, url: &str) -> Result<MediaStream, AppError> {
        self.opened.lock().unwrap().push(url.to_string());
        let script = self
            .scripts
            .get(url)
            .cloned()
            .unwrap_or_else(|| Script::chunks(vec![vec![0u8; 16]], Some(16)));

        let (chunks, tail, total) = match script {
            Script::OpenError(error) => return Err(error),
            Script::Chunks { chunks, total } => (chunks, None, total),
            Script::FailAfter { chunks, error } => {
                let total = chunks.iter().map(|c| c.len() as u64).sum::<u64>() * 2;
                (chunks, Some(error), Some(total))
            }
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        let guard = ActiveGuard(self.active.clone());

        let delay = self.chunk_delay;
        let items = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from(c)))
            .chain(tail.map(Err));
        let chunks = futures::stream::iter(items)
            .then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .map(move |item| {
                let _ = &guard;
                item
            })
            .boxed();

        Ok(MediaStream {
            total_bytes: total,
            chunks,
        })
    }
}

pub struct FakePlaylists {
    playlist: Result<Playlist, AppError>,
    single: Result<PlaylistItem, AppError>,
    pub playlist_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
}

impl FakePlaylists {
    pub fn playlist(title: &str, items: Vec<PlaylistItem>) -> Self {
        Self {
            playlist: Ok(Playlist {
                title: title.to_string(),
                estimated_count: Some(items.len()),
                items,
            }),
            single: Err(AppError::Resolution("single lookup not expected".into())),
            playlist_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: AppError, single: Result<PlaylistItem, AppError>) -> Self {
        Self {
            playlist: Err(error),
            single,
            playlist_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlaylistResolver for FakePlaylists {
    async fn resolve_playlist(&self, _link: &str) -> Result<Playlist, AppError> {
        self.playlist_calls.fetch_add(1, Ordering::SeqCst);
        self.playlist.clone()
    }

    async fn resolve_single(&self, _link: &str) -> Result<PlaylistItem, AppError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.single.clone()
    }
}

pub fn items(names: &[&str]) -> Vec<PlaylistItem> {
    names
        .iter()
        .map(|name| PlaylistItem::new(*name, format!("https://v/{}", name)))
        .collect()
}
