use std::path::PathBuf;

use clap::Parser;

use crate::api::ApiConfig;
use crate::application::BatchOptions;
use crate::domain::AppError;
use crate::utils::normalize_link;

/// Download every video of a playlist, several at a time
#[derive(Parser, Debug, Clone)]
#[command(name = "playlist-dl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Playlist or video link (a bare playlist or video id also works)
    #[arg(short, long, value_name = "LINK")]
    pub link: String,

    /// Directory to save into
    #[arg(short, long, value_name = "DIRECTORY", default_value = ".")]
    pub output: PathBuf,

    /// Save into a subdirectory named after the playlist
    #[arg(long)]
    pub title_dir: bool,

    /// Maximum number of simultaneous downloads
    #[arg(short, long, default_value_t = 5)]
    pub concurrency: usize,

    /// Number of playlist items to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Maximum number of items to download (all when omitted)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Container to pick the download format by
    #[arg(long, value_name = "EXT", default_value = "mp4")]
    pub container: String,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PATH", env = "PLAYLIST_DL_YTDLP", default_value = "yt-dlp")]
    pub ytdlp: String,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Checks the arguments and returns the normalized link.
    pub fn validate(&self) -> Result<String, AppError> {
        if self.concurrency == 0 {
            return Err(AppError::Input("--concurrency must be at least 1".to_string()));
        }
        if self.container.trim().is_empty() {
            return Err(AppError::Input("--container must not be empty".to_string()));
        }
        if self.link.trim().is_empty() {
            return Err(AppError::Input("--link must not be empty".to_string()));
        }
        normalize_link(&self.link)
            .ok_or_else(|| AppError::Input(format!("not a playlist or video link: {}", self.link)))
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            offset: self.offset,
            limit: self.limit,
            output_dir: self.output.clone(),
            title_dir: self.title_dir,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            ytdlp_path: self.ytdlp.clone(),
            container: self.container.trim().to_string(),
            ..Default::default()
        }
    }
}
