//! Search command implementation.

use super::prepare;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, video: Option<&str>, settings: Settings) -> Result<()> {
    let services = prepare(Operation::Ask, settings)?;

    let spinner = Output::spinner("Searching...");
    let results = services
        .rag
        .semantic_search(query, video.unwrap_or_default())
        .await;
    spinner.finish_and_clear();

    let results = results?;
    Output::header(&format!("Results for: {}", query));
    println!("{}", results);
    Ok(())
}
