//! Ingest command implementation.

use super::prepare;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(url: &str, force: bool, settings: Settings) -> Result<()> {
    let services = prepare(Operation::Ingest, settings)?;

    let spinner = Output::spinner("Fetching metadata and transcript...");
    let result = services.orchestrator.ingest_youtube(url, force).await;
    spinner.finish_and_clear();

    let result = result?;
    if result.skipped {
        Output::info(&format!(
            "'{}' is already ingested ({} chunks). Use --force to process it again.",
            result.title, result.chunk_count
        ));
    } else {
        Output::success(&format!("Ingested '{}'", result.title));
        Output::kv("Video ID", &result.youtube_id);
        Output::kv("Chunks", &result.chunk_count.to_string());
    }
    Ok(())
}
