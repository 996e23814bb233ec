//! Brief command: generate a brief and optionally render it to PDF.

use super::prepare;
use crate::brief::save_brief_pdf;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the brief command.
pub async fn run_brief(video: &str, pdf: Option<&str>, settings: Settings) -> Result<()> {
    let services = prepare(Operation::Ask, settings)?;

    let spinner = Output::spinner("Writing brief...");
    let brief = services.briefs.generate_brief_text(video).await;
    spinner.finish_and_clear();
    let brief = brief?;

    println!("{}", brief);

    if let Some(pdf) = pdf {
        let path = Path::new(pdf);
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => services.settings.brief_output_dir(),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| services.settings.brief.pdf_filename.clone());
        let written = save_brief_pdf(&brief, &dir, &name)?;
        Output::success(&format!("Saved PDF to {}", written.display()));
    }
    Ok(())
}
