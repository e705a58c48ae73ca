use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Not a playlist: {0}")]
    ResolutionNotFound(String),

    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("No matching format: {0}")]
    FormatUnavailable(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),
}
