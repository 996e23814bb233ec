//! One-page video briefs: Markdown generation and PDF export.

mod generator;
mod pdf;

pub use generator::{finalize_brief, BriefGenerator, BriefHeader, BRIEF_UNAVAILABLE};
pub use pdf::{pdf_file_name, render_pdf, save_brief_pdf};
