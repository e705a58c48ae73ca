pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    BatchResult, DownloadJob, JobOutcome, JobState, Playlist, PlaylistItem, ProgressState,
};
