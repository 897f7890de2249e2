//! PDF reports: compose HTML, then hand it to a [`render::PdfRenderer`].
//!
//! ```text
//! ReportEntry[] ──▶ collect_sections ──▶ student_report_html ──▶ write_report
//!                   (image checks)        (superscripts, table)    (PDF on disk)
//! ```

pub mod compose;
pub mod render;

use crate::config::ServiceConfig;
use crate::error::SmartMarksError;
use crate::model::Suggestions;
use compose::{ReportEntry, StudentInfo};
use render::PdfRenderer;
use std::path::PathBuf;

/// Filename prefix of student reports.
pub const STUDENT_REPORT_PREFIX: &str = "student_report";

/// Filename prefix of improvement reports.
pub const IMPROVEMENT_REPORT_PREFIX: &str = "improvement";

/// Build and render the student report for client-supplied results.
///
/// # Errors
/// [`SmartMarksError::EmptyInput`] if no entry has a valid image; rendering
/// and I/O failures otherwise.
pub async fn generate_student_report(
    renderer: &dyn PdfRenderer,
    config: &ServiceConfig,
    info: &StudentInfo,
    entries: Vec<ReportEntry>,
) -> Result<PathBuf, SmartMarksError> {
    let sections = compose::collect_sections(&config.upload_dir, entries).await?;
    let html = compose::student_report_html(info, &sections, config.annotation);
    render::write_report(renderer, &config.pdf_dir, STUDENT_REPORT_PREFIX, &html).await
}

/// Build and render the improvement report.
pub async fn generate_improvement_report(
    renderer: &dyn PdfRenderer,
    config: &ServiceConfig,
    text: &str,
    metrics: &serde_json::Value,
    suggestions: &Suggestions,
) -> Result<PathBuf, SmartMarksError> {
    let html = compose::improvement_report_html(text, metrics, suggestions);
    render::write_report(renderer, &config.pdf_dir, IMPROVEMENT_REPORT_PREFIX, &html).await
}
