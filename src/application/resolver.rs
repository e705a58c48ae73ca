use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::{AppError, Playlist, PlaylistItem};

/// Expands a link into an ordered list of items.
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Fails with [`AppError::ResolutionNotFound`] when the link is not a playlist.
    async fn resolve_playlist(&self, link: &str) -> Result<Playlist, AppError>;

    async fn resolve_single(&self, link: &str) -> Result<PlaylistItem, AppError>;
}

pub struct MediaStream {
    pub total_bytes: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, AppError>>,
}

/// Turns a single item's URL into a byte stream in one fixed container.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// File extension of every stream this resolver opens.
    fn container(&self) -> &str;

    async fn open(&self, url: &str) -> Result<MediaStream, AppError>;
}
