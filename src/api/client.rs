use std::process::Stdio;

use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use thiserror::Error;
use tokio::process::Command;

use super::models::{ApiConfig, FormatInfo, MediaInfo};
use crate::application::{MediaResolver, MediaStream, PlaylistResolver};
use crate::domain::{AppError, Playlist, PlaylistItem};

/// yt-dlp stderr fragments meaning "this link exists but is not a list".
const NOT_A_PLAYLIST_MARKERS: &[&str] = &[
    "not a playlist",
    "does not exist",
    "unable to recognize playlist",
    "unsupported url",
    "http error 404",
];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to run yt-dlp: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("yt-dlp exited with {status}: {stderr}")]
    ProcessError { status: String, stderr: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Download URL not found")]
    NoDownloadUrl,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    fn is_not_a_playlist(&self) -> bool {
        match self {
            ApiError::ProcessError { stderr, .. } => {
                let stderr = stderr.to_lowercase();
                NOT_A_PLAYLIST_MARKERS.iter().any(|m| stderr.contains(m))
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct YtDlpClient {
    config: ApiConfig,
    http: Client,
}

impl YtDlpClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { config, http })
    }

    async fn dump_json(&self, args: &[&str], link: &str) -> Result<MediaInfo> {
        tracing::debug!(link, ?args, "running yt-dlp");
        let output = Command::new(&self.config.ytdlp_path)
            .args(args)
            .args(["--dump-single-json", "--no-warnings", "--no-progress"])
            .arg(link)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ApiError::ProcessError {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Lists a playlist without resolving each entry
    pub async fn fetch_playlist(&self, link: &str) -> Result<MediaInfo> {
        self.dump_json(&["--flat-playlist"], link).await
    }

    /// Full metadata, including the format list, for one video
    pub async fn fetch_video(&self, link: &str) -> Result<MediaInfo> {
        self.dump_json(&["--skip-download", "--no-playlist"], link).await
    }

    /// Download file with progress stream
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        format: &FormatInfo,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let url = format.url.as_deref().ok_or(ApiError::NoDownloadUrl)?;

        let mut request = self.http.get(url);
        for (name, value) in &format.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?.error_for_status()?;

        let total_size = response.content_length().or(format.size_hint());
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}

/// First muxed format in the requested container that has a URL.
pub fn select_format<'a>(formats: &'a [FormatInfo], container: &str) -> Option<&'a FormatInfo> {
    formats.iter().find(|f| {
        f.ext.as_deref() == Some(container) && f.is_muxed() && f.url.is_some()
    })
}

fn playlist_from_info(link: &str, info: MediaInfo) -> std::result::Result<Playlist, AppError> {
    if !info.is_playlist() {
        return Err(AppError::ResolutionNotFound(link.to_string()));
    }

    let items: Vec<PlaylistItem> = info
        .entries
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let url = match (entry.url, entry.id.as_deref()) {
                (Some(url), _) => url,
                (None, Some(id)) => format!("https://www.youtube.com/watch?v={}", id),
                (None, None) => return None,
            };
            let title = entry.title.or(entry.id).unwrap_or_else(|| url.clone());
            Some(PlaylistItem::new(title, url))
        })
        .collect();

    Ok(Playlist {
        title: info.title.or(info.id).unwrap_or_else(|| "playlist".to_string()),
        estimated_count: info.playlist_count.or(Some(items.len())),
        items,
    })
}

#[async_trait]
impl PlaylistResolver for YtDlpClient {
    async fn resolve_playlist(&self, link: &str) -> std::result::Result<Playlist, AppError> {
        match self.fetch_playlist(link).await {
            Ok(info) => playlist_from_info(link, info),
            Err(e) if e.is_not_a_playlist() => Err(AppError::ResolutionNotFound(e.to_string())),
            Err(e) => Err(AppError::Resolution(e.to_string())),
        }
    }

    async fn resolve_single(&self, link: &str) -> std::result::Result<PlaylistItem, AppError> {
        let info = self
            .fetch_video(link)
            .await
            .map_err(|e| AppError::Resolution(e.to_string()))?;

        let url = info.webpage_url.unwrap_or_else(|| link.to_string());
        let title = info.title.or(info.id).unwrap_or_else(|| url.clone());
        Ok(PlaylistItem::new(title, url))
    }
}

#[async_trait]
impl MediaResolver for YtDlpClient {
    fn container(&self) -> &str {
        &self.config.container
    }

    async fn open(&self, url: &str) -> std::result::Result<MediaStream, AppError> {
        let info = self
            .fetch_video(url)
            .await
            .map_err(|e| AppError::Stream(e.to_string()))?;

        let format = select_format(&info.formats, &self.config.container).ok_or_else(|| {
            AppError::FormatUnavailable(format!(
                "no {} format with audio and video for {}",
                self.config.container, url
            ))
        })?;
        tracing::debug!(url, format_id = ?format.format_id, "selected format");

        let (total_bytes, stream) = self
            .download_file_stream(format)
            .await
            .map_err(|e| AppError::Stream(e.to_string()))?;

        Ok(MediaStream {
            total_bytes,
            chunks: stream.map_err(|e| AppError::Stream(e.to_string())).boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn format(ext: &str, vcodec: &str, acodec: &str, url: Option<&str>) -> FormatInfo {
        FormatInfo {
            format_id: Some(format!("{}-{}-{}", ext, vcodec, acodec)),
            ext: Some(ext.to_string()),
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_format_picks_first_muxed_container_match() {
        let formats = vec![
            format("webm", "vp9", "opus", Some("https://a")),
            format("mp4", "avc1", "none", Some("https://b")),
            format("mp4", "avc1", "mp4a", None),
            format("mp4", "avc1", "mp4a", Some("https://c")),
            format("mp4", "avc1", "mp4a", Some("https://d")),
        ];
        let chosen = select_format(&formats, "mp4").unwrap();
        assert_eq!(chosen.url.as_deref(), Some("https://c"));
        assert!(select_format(&formats, "mkv").is_none());
    }

    #[test]
    fn test_playlist_from_info() {
        let info: MediaInfo = serde_json::from_value(json!({
            "_type": "playlist",
            "id": "PLx",
            "title": "Mix",
            "playlist_count": 3,
            "entries": [
                {"id": "a1", "title": "First", "url": "https://www.youtube.com/watch?v=a1"},
                null,
                {"id": "b2"},
                {"title": "orphan"}
            ]
        }))
        .unwrap();

        let playlist = playlist_from_info("PLx", info).unwrap();
        assert_eq!(playlist.title, "Mix");
        assert_eq!(playlist.estimated_count, Some(3));
        assert_eq!(
            playlist.items,
            vec![
                PlaylistItem::new("First", "https://www.youtube.com/watch?v=a1"),
                PlaylistItem::new("b2", "https://www.youtube.com/watch?v=b2"),
            ]
        );
    }

    #[test]
    fn test_video_payload_is_not_a_playlist() {
        let info: MediaInfo =
            serde_json::from_value(json!({"_type": "video", "id": "a1", "title": "Solo"})).unwrap();
        assert!(matches!(
            playlist_from_info("a1", info),
            Err(AppError::ResolutionNotFound(_))
        ));
    }

    #[test]
    fn test_not_a_playlist_detection() {
        let not_found = ApiError::ProcessError {
            status: "exit status: 1".into(),
            stderr: "ERROR: [youtube:tab] PLnope: The playlist does not exist.".into(),
        };
        assert!(not_found.is_not_a_playlist());

        let network = ApiError::ProcessError {
            status: "exit status: 1".into(),
            stderr: "ERROR: Unable to download webpage: timed out".into(),
        };
        assert!(!network.is_not_a_playlist());
    }

    #[tokio::test]
    async fn test_download_file_stream_forwards_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/video.mp4")
            .match_header("x-token", "abc")
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let mut fmt = format("mp4", "avc1", "mp4a", None);
        fmt.url = Some(format!("{}/video.mp4", server.url()));
        fmt.http_headers.insert("x-token".into(), "abc".into());

        let client = YtDlpClient::new(ApiConfig::default()).unwrap();
        let (total, stream) = client.download_file_stream(&fmt).await.unwrap();
        let chunks: Vec<_> = stream.try_collect().await.unwrap();

        assert_eq!(total, Some(4096));
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 4096);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_file_stream_rejects_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.mp4")
            .with_status(403)
            .create_async()
            .await;

        let mut fmt = format("mp4", "avc1", "mp4a", None);
        fmt.url = Some(format!("{}/gone.mp4", server.url()));

        let client = YtDlpClient::new(ApiConfig::default()).unwrap();
        assert!(matches!(
            client.download_file_stream(&fmt).await,
            Err(ApiError::RequestError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_resolution_error() {
        let client = YtDlpClient::new(ApiConfig {
            ytdlp_path: "/nonexistent/yt-dlp".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            client.resolve_playlist("https://example.com/list").await,
            Err(AppError::Resolution(_))
        ));
    }
}
