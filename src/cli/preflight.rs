//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{EvrikaError, Result};
use crate::transcription::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion needs the API key and the media tools.
    Ingest,
    /// Answering, searching and briefs need the API key.
    Ask,
    /// Listing only reads the store.
    List,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_store(settings)?;
    match operation {
        Operation::Ingest => {
            check_api_key()?;
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Operation::Ask => check_api_key()?,
        Operation::List => {}
    }
    Ok(())
}

fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(EvrikaError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' or add it to .env"
                .to_string(),
        ))
    }
}

fn check_store(settings: &Settings) -> Result<()> {
    if settings.vector_store.provider != VectorStoreProvider::Supabase {
        return Ok(());
    }
    if settings.vector_store.supabase_url.is_none() {
        return Err(EvrikaError::Config(
            "SUPABASE_URL not set for the supabase vector store".to_string(),
        ));
    }
    Settings::supabase_service_key().map(|_| ())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(EvrikaError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(EvrikaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(EvrikaError::ToolFailed(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_with_local_store_has_no_requirements() {
        assert!(check(Operation::List, &Settings::default()).is_ok());
    }

    #[test]
    fn test_missing_tool_is_reported() {
        assert!(matches!(
            check_tool("evrika-no-such-tool"),
            Err(EvrikaError::ToolNotFound(_))
        ));
    }
}
