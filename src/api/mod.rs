pub mod client;
pub mod models;

pub use client::YtDlpClient;
pub use models::ApiConfig;
