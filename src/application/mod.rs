pub mod batch;
pub mod download_coordinator;
pub mod limiter;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchOptions, BatchOrchestrator};
pub use download_coordinator::ItemDownloader;
pub use resolver::{MediaResolver, MediaStream, PlaylistResolver};
