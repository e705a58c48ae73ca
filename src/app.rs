use std::sync::Arc;

use crate::api::YtDlpClient;
use crate::application::{BatchOrchestrator, ItemDownloader};
use crate::cli::Cli;
use crate::domain::{AppError, BatchResult, JobOutcome};
use crate::ui::TerminalReporter;

/// Exit status for errors that stop the run before anything is scheduled.
pub const FATAL_EXIT_CODE: i32 = 1;

pub struct DownloadApp {
    cli: Cli,
}

impl DownloadApp {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Runs the whole download and returns the process exit status.
    pub async fn run(self) -> i32 {
        match self.execute().await {
            Ok(result) => {
                for outcome in result.outcomes() {
                    if let JobOutcome::Failure { title, error } = outcome {
                        eprintln!("Failed: {}: {}", title, error);
                    }
                }
                println!("{}", summary_line(&result));
                result.exit_code()
            }
            Err(e) => {
                tracing::error!(error = %e, "download aborted");
                eprintln!("Error: {}", e);
                FATAL_EXIT_CODE
            }
        }
    }

    async fn execute(&self) -> Result<BatchResult, AppError> {
        let link = self.cli.validate()?;

        let client = Arc::new(
            YtDlpClient::new(self.cli.api_config())
                .map_err(|e| AppError::Resolution(e.to_string()))?,
        );
        let reporter = Arc::new(TerminalReporter::default());
        let downloader = ItemDownloader::new(client.clone(), reporter);
        let batch = BatchOrchestrator::new(downloader, self.cli.concurrency)?;

        batch
            .run_link(client.as_ref(), &link, &self.cli.batch_options())
            .await
    }
}

pub fn summary_line(result: &BatchResult) -> String {
    format!(
        "Downloaded {} of {} items ({} failed)",
        result.succeeded(),
        result.len(),
        result.failed()
    )
}
