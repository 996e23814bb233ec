//! Ask command implementation.

use super::prepare;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;

/// Run the ask command.
pub async fn run_ask(question: &str, video: Option<&str>, settings: Settings) -> Result<()> {
    let services = prepare(Operation::Ask, settings)?;

    let spinner = Output::spinner("Searching transcripts...");
    let answer = services
        .rag
        .answer_question(question, video.unwrap_or_default())
        .await;
    spinner.finish_and_clear();

    println!("\n{}\n", style("Answer").bold().underlined());
    println!("{}\n", answer?);
    Ok(())
}
