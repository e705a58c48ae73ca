use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Payload of `yt-dlp --dump-single-json`, for both playlists and single videos.
///
/// Only the fields the downloader reads are mapped; everything is optional
/// because flat playlist entries and older videos omit most of them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaInfo {
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub playlist_count: Option<usize>,
    #[serde(default)]
    pub entries: Vec<Option<PlaylistEntry>>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

impl MediaInfo {
    pub fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist")
    }
}

/// One entry of a `--flat-playlist` listing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl FormatInfo {
    fn has_codec(codec: &Option<String>) -> bool {
        matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
    }

    /// Carries both an audio and a video track in one container.
    pub fn is_muxed(&self) -> bool {
        Self::has_codec(&self.vcodec) && Self::has_codec(&self.acodec)
    }

    pub fn size_hint(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub ytdlp_path: String,
    pub container: String,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            container: "mp4".to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
