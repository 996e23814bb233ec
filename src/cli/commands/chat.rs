//! Interactive chat with the tool-calling agent.

use super::prepare;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    let services = prepare(Operation::Ask, settings)?;

    println!("\n{}", style("Evrika Chat").bold().cyan());
    println!(
        "{}\n",
        style("Paste a YouTube link or ask a question. 'clear' resets the conversation, 'exit' quits.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }
        if input.eq_ignore_ascii_case("clear") {
            services.session.clear_history().await;
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let reply = services.agent.respond(input).await;
        spinner.finish_and_clear();

        match reply {
            Ok(response) => println!("\n{} {}\n", style("Evrika:").cyan().bold(), response),
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}
