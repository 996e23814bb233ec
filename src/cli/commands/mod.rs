//! CLI command implementations.

mod ask;
mod brief;
mod chat;
mod config;
mod doctor;
mod ingest;
mod list;
mod search;
mod serve;

pub use ask::run_ask;
pub use brief::run_brief;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
pub use serve::run_serve;

use crate::app::Services;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run pre-flight checks and build the shared services.
fn prepare(operation: Operation, settings: Settings) -> Result<Services> {
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'evrika doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(Services::from_settings(settings)?)
}
