//! Serve command: run the HTTP API for the web front-end.

use super::prepare;
use crate::api;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    mut settings: Settings,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let services = Arc::new(prepare(Operation::Ask, settings)?);

    Output::header("Evrika Briefs API");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /chat");
    Output::kv("Ingest", "POST /ingest");
    Output::kv("Brief", "POST /brief, /generate-brief, /brief/pdf");
    Output::kv("Text query", "POST /text-query");
    Output::kv("Voice query", "POST /voice-query");
    println!();

    api::serve(services, &addr).await?;
    Ok(())
}
