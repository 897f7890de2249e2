//! HTML → PDF rendering and output-file naming.
//!
//! [`PdfRenderer`] abstracts the converter so tests can substitute a fake.
//! The production backend, [`WkHtmlToPdf`], pipes the document into the
//! `wkhtmltopdf` executable with local file access enabled, because report
//! images are referenced by absolute path.
//!
//! Output files are named `<prefix>_<unix-millis>.pdf`. Rendering goes to a
//! `.pdf.tmp` sibling that is renamed into place, so a crashed render never
//! leaves a truncated report under the final name.

use crate::error::SmartMarksError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts an HTML document into a PDF file at `output`.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, output: &Path) -> Result<(), SmartMarksError>;
}

/// Renderer backed by the `wkhtmltopdf` command-line tool.
#[derive(Debug, Clone)]
pub struct WkHtmlToPdf {
    binary: PathBuf,
}

impl WkHtmlToPdf {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PdfRenderer for WkHtmlToPdf {
    async fn render(&self, html: &str, output: &Path) -> Result<(), SmartMarksError> {
        let mut child = Command::new(&self.binary)
            .arg("--quiet")
            .arg("--encoding")
            .arg("utf-8")
            .arg("--enable-local-file-access")
            .arg("-")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SmartMarksError::RenderFailed {
                detail: format!("cannot start {}: {}", self.binary.display(), e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(html.as_bytes())
                .await
                .map_err(|e| SmartMarksError::RenderFailed {
                    detail: format!("writing HTML to converter: {}", e),
                })?;
            // Dropping stdin closes the pipe so the converter sees EOF.
        }

        let out = child
            .wait_with_output()
            .await
            .map_err(|e| SmartMarksError::RenderFailed {
                detail: e.to_string(),
            })?;

        if !out.status.success() {
            return Err(SmartMarksError::RenderFailed {
                detail: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

/// Build a unique report filename, e.g. `student_report_1718000000123_9f86d081.pdf`.
///
/// The random suffix keeps reports rendered in the same millisecond apart.
pub fn report_filename(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.pdf",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

/// Render `html` into `pdf_dir/<prefix>_<millis>_<suffix>.pdf` and return its path.
pub async fn write_report(
    renderer: &dyn PdfRenderer,
    pdf_dir: &Path,
    prefix: &str,
    html: &str,
) -> Result<PathBuf, SmartMarksError> {
    tokio::fs::create_dir_all(pdf_dir)
        .await
        .map_err(|e| SmartMarksError::OutputWriteFailed {
            path: pdf_dir.to_path_buf(),
            source: e,
        })?;

    let path = pdf_dir.join(report_filename(prefix));
    let tmp_path = path.with_extension("pdf.tmp");
    debug!("Rendering {} bytes of HTML to {}", html.len(), tmp_path.display());

    if let Err(e) = renderer.render(html, &tmp_path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| SmartMarksError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    info!("PDF saved: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRenderer;

    #[async_trait]
    impl PdfRenderer for FakeRenderer {
        async fn render(&self, html: &str, output: &Path) -> Result<(), SmartMarksError> {
            tokio::fs::write(output, format!("%PDF-1.4\n{}", html.len()))
                .await
                .map_err(|e| SmartMarksError::RenderFailed {
                    detail: e.to_string(),
                })
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PdfRenderer for FailingRenderer {
        async fn render(&self, _html: &str, output: &Path) -> Result<(), SmartMarksError> {
            tokio::fs::write(output, b"partial").await.ok();
            Err(SmartMarksError::RenderFailed {
                detail: "boom".into(),
            })
        }
    }

    #[test]
    fn filename_has_prefix_and_extension() {
        let name = report_filename("improvement");
        assert!(name.starts_with("improvement_"));
        assert!(name.ends_with(".pdf"));
        let stem = &name["improvement_".len()..name.len() - 4];
        let (millis, suffix) = stem.split_once('_').expect("millis and suffix");
        assert!(millis.parse::<i64>().is_ok(), "got {name}");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()), "got {name}");
    }

    #[test]
    fn filenames_do_not_collide() {
        let names: std::collections::HashSet<String> =
            (0..64).map(|_| report_filename("student_report")).collect();
        assert_eq!(names.len(), 64);
    }

    #[tokio::test]
    async fn concurrent_reports_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = tokio::join!(
            write_report(&FakeRenderer, dir.path(), "improvement", "<p>a</p>"),
            write_report(&FakeRenderer, dir.path(), "improvement", "<p>b</p>"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
    }

    #[tokio::test]
    async fn write_report_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_dir = dir.path().join("nested/pdfs");
        let path = write_report(&FakeRenderer, &pdf_dir, "student_report", "<html></html>")
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn failed_render_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_report(&FailingRenderer, dir.path(), "student_report", "<html/>")
            .await
            .unwrap_err();
        assert!(matches!(err, SmartMarksError::RenderFailed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_binary_is_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = WkHtmlToPdf::new("/nonexistent/wkhtmltopdf");
        let err = renderer
            .render("<html/>", &dir.path().join("x.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot start"));
    }
}
