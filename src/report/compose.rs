//! Report composition: results + metadata → a self-contained HTML document.
//!
//! Two documents are produced here:
//!
//! * the **student report**: one section per graded image with the
//!   photograph, the superscript-annotated transcription, the error table and
//!   the highlighted text;
//! * the **improvement report**: metrics and suggestions for a free text.
//!
//! Values are interpolated as-is (no escaping); the transcription and marked
//! text already contain the annotation markup and are trusted as HTML.

use crate::config::AnnotationStrategy;
use crate::error::SmartMarksError;
use crate::model::{CorrectionEntry, ErrorCategory, Suggestions};
use crate::pipeline::{annotate, encode};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Student metadata printed at the top of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub student_name: String,
    pub student_class: String,
    pub subject: String,
}

impl StudentInfo {
    /// Fill missing fields with `"Unknown"`.
    pub fn from_optional(
        name: Option<String>,
        class: Option<String>,
        subject: Option<String>,
    ) -> Self {
        let unknown = || "Unknown".to_string();
        Self {
            student_name: name.unwrap_or_else(unknown),
            student_class: class.unwrap_or_else(unknown),
            subject: subject.unwrap_or_else(unknown),
        }
    }
}

/// One client-supplied result to print. Need not match the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub error_table: Option<Vec<CorrectionEntry>>,
    #[serde(default)]
    pub marked_text: Option<String>,
}

impl ReportEntry {
    /// Read one entry from client JSON without rejecting it as a whole.
    ///
    /// A non-string `image` leaves the entry without an image, so it is
    /// skipped later. A non-array `errorTable` reads as no table; rows that
    /// are not objects are dropped.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            image: text("image"),
            extracted_text: text("extractedText"),
            error_table: value
                .get("errorTable")
                .and_then(|t| t.as_array())
                .map(|rows| rows.iter().filter_map(table_row).collect()),
            marked_text: text("markedText"),
        }
    }
}

fn table_row(row: &serde_json::Value) -> Option<CorrectionEntry> {
    let row = row.as_object()?;
    let cell = |keys: [&str; 2]| {
        keys.iter()
            .find_map(|k| row.get(*k))
            .and_then(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    };
    Some(CorrectionEntry {
        incorrect: cell(["Incorrect Text", "incorrectText"]).unwrap_or_default(),
        correct: cell(["Correct Text", "correctText"]).unwrap_or_default(),
        category: cell(["Error Category", "errorCategory"])
            .map(|label| ErrorCategory::from(label.as_str()))
            .unwrap_or_default(),
    })
}

/// A validated report section whose image is known to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub image_path: PathBuf,
    pub extracted_text: String,
    pub error_table: Vec<CorrectionEntry>,
    pub marked_text: String,
}

/// Resolve every entry's image under `upload_dir`, dropping entries whose
/// image is missing, outside the directory, or not decodable.
///
/// # Errors
/// [`SmartMarksError::EmptyInput`] when nothing survives.
pub async fn collect_sections(
    upload_dir: &Path,
    entries: Vec<ReportEntry>,
) -> Result<Vec<ReportSection>, SmartMarksError> {
    let mut sections = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(name) = entry.image.filter(|n| is_plain_filename(n)) else {
            warn!("Skipping report entry without a usable image reference");
            continue;
        };
        let path = upload_dir.join(&name);
        if let Err(e) = encode::verify_image(&path).await {
            warn!("Skipping report image {}: {}", name, e);
            continue;
        }
        let image_path = tokio::fs::canonicalize(&path).await.unwrap_or(path);

        sections.push(ReportSection {
            image_path,
            extracted_text: entry
                .extracted_text
                .unwrap_or_else(|| "No extracted text".to_string()),
            error_table: entry.error_table.unwrap_or_default(),
            marked_text: entry
                .marked_text
                .unwrap_or_else(|| "No marked text".to_string()),
        });
    }

    if sections.is_empty() {
        return Err(SmartMarksError::EmptyInput);
    }
    debug!("{} report sections after image checks", sections.len());
    Ok(sections)
}

/// A bare filename: no directory components, no parent references.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != ".."
        && !name.contains("..")
}

const STUDENT_REPORT_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; }
        h1, h2, h3 { color: #333; }
        p { font-size: 14px; color: #444; }
        .highlight-red { color: red; font-weight: bold; }
        .highlight-green { color: green; font-weight: bold; }
        .highlight-blue { color: blue; font-weight: bold; }
        .error-table { width: 100%; border-collapse: collapse; margin-top: 15px; font-size: 14px; }
        .error-table th, .error-table td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        .error-table th { background-color: #f2f2f2; color: black; }
        .section-divider { margin-top: 30px; border-top: 3px solid #000; }
        .extracted-text { background-color: #f9f9f9; border: 1px solid #ddd; padding: 10px; font-size: 14px; }
        .marked-text { background-color: #f3f3f3; border: 1px solid #bbb; padding: 10px; font-size: 14px; }
        sup { font-size: 10px; vertical-align: super; color: red; }
"#;

/// Render the student report HTML.
pub fn student_report_html(
    info: &StudentInfo,
    sections: &[ReportSection],
    strategy: AnnotationStrategy,
) -> String {
    let mut html = String::with_capacity(4096 + sections.len() * 2048);
    let _ = write!(
        html,
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<style>{}</style>\n</head>\n<body>\n\
         <h1 style=\"text-align:center;\">Student Report</h1>\n\
         <p><strong>Student Name:</strong> {}</p>\n\
         <p><strong>Class:</strong> {}</p>\n\
         <p><strong>Subject:</strong> {}</p>\n",
        STUDENT_REPORT_STYLE, info.student_name, info.student_class, info.subject
    );

    for (i, section) in sections.iter().enumerate() {
        let annotated = annotate::superscript(&section.extracted_text, &section.error_table, strategy);
        let _ = write!(
            html,
            "<div class=\"section-divider\"></div>\n\
             <h2>Image {}</h2>\n\
             <h3>Uploaded Image:</h3>\n\
             <img src=\"{}\" style=\"width:100%; max-height:400px;\" />\n\
             <h3>Extracted Text (Errors Marked in Superscript):</h3>\n\
             <p class=\"extracted-text\">{}</p>\n\
             <h3>Errors in the Text:</h3>\n\
             {}\n\
             <h3>Marked Text:</h3>\n\
             <p class=\"marked-text\">{}</p>\n",
            i + 1,
            section.image_path.display(),
            annotated,
            error_table_html(&section.error_table),
            section.marked_text
        );
    }

    html.push_str("</body></html>");
    html
}

fn error_table_html(table: &[CorrectionEntry]) -> String {
    if table.is_empty() {
        return "<p>No errors found.</p>".to_string();
    }
    let mut out = String::from(
        "<table class=\"error-table\">\n<tr>\
         <th>Incorrect Text (Red)</th>\
         <th>Correct Text (Green)</th>\
         <th>Error Category (Blue)</th></tr>\n",
    );
    for row in table {
        let _ = writeln!(
            out,
            "<tr><td class=\"highlight-red\">{}</td>\
             <td class=\"highlight-green\">{}</td>\
             <td class=\"highlight-blue\">{}</td></tr>",
            row.incorrect, row.correct, row.category
        );
    }
    out.push_str("</table>");
    out
}

/// Render the improvement report HTML.
///
/// `metrics` is whatever the client echoed back from `/get_improvements`;
/// absent values are printed as `–`.
pub fn improvement_report_html(
    text: &str,
    metrics: &serde_json::Value,
    suggestions: &Suggestions,
) -> String {
    let metric = |key: &str| -> String {
        match metrics.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) if !v.is_null() => v.to_string(),
            _ => "–".to_string(),
        }
    };

    let mut html = String::from("<html><head><meta charset=\"utf-8\"></head><body style='font-family:Arial;'>");
    html.push_str("<h1>Text Improvement Report</h1>");
    html.push_str("<h2>Original Text</h2>");
    let _ = write!(html, "<p>{}</p>", text.replace('\n', "<br>"));

    html.push_str("<h2>Complexity Metrics</h2><ul>");
    let _ = write!(html, "<li>Word Count: {}</li>", metric("word_count"));
    let _ = write!(html, "<li>Sentence Count: {}</li>", metric("sentence_count"));
    let _ = write!(html, "<li>Avg. Words / Sentence: {}</li>", metric("avg_words_per_sentence"));
    let _ = write!(html, "<li>Avg. Word Length: {}</li>", metric("avg_word_length"));
    let _ = write!(html, "<li>Vocabulary Diversity: {}%</li>", metric("vocabulary_diversity"));
    html.push_str("</ul>");

    push_list(&mut html, "Strengths", &suggestions.strengths);
    push_list(&mut html, "Style Improvements", &suggestions.style_improvements);

    html.push_str("<h2>Vocabulary Enhancements</h2><ul>");
    for entry in &suggestions.vocabulary_enhancements {
        let _ = write!(
            html,
            "<li><b>{}</b> → {}</li>",
            entry.original,
            entry.suggestions.join(", ")
        );
    }
    html.push_str("</ul>");

    push_list(&mut html, "Structure Suggestions", &suggestions.structure_suggestions);
    html.push_str("</body></html>");
    html
}

fn push_list(html: &mut String, title: &str, items: &[String]) {
    let _ = write!(html, "<h2>{}</h2><ul>", title);
    for item in items {
        let _ = write!(html, "<li>{}</li>", item);
    }
    html.push_str("</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VocabularyEnhancement;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str) {
        RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]))
            .save(dir.join(name))
            .expect("write png");
    }

    fn entry(image: &str) -> ReportEntry {
        ReportEntry {
            image: Some(image.to_string()),
            extracted_text: Some("teh cat".into()),
            error_table: Some(vec![CorrectionEntry::new("teh", "the", ErrorCategory::Spelling)]),
            marked_text: Some("<span style=\"color:red;\">teh</span> cat".into()),
        }
    }

    #[tokio::test]
    async fn invalid_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "good.png");
        std::fs::write(dir.path().join("bad.png"), b"garbage").unwrap();

        let sections = collect_sections(
            dir.path(),
            vec![
                entry("missing.png"),
                entry("bad.png"),
                entry("good.png"),
                entry("../good.png"),
                ReportEntry::default(),
            ],
        )
        .await
        .unwrap();

        assert_eq!(sections.len(), 1);
        assert!(sections[0].image_path.ends_with("good.png"));
    }

    #[tokio::test]
    async fn all_invalid_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_sections(dir.path(), vec![entry("missing.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, SmartMarksError::EmptyInput));
    }

    #[tokio::test]
    async fn missing_text_fields_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let sections = collect_sections(
            dir.path(),
            vec![ReportEntry {
                image: Some("a.png".into()),
                ..Default::default()
            }],
        )
        .await
        .unwrap();
        assert_eq!(sections[0].extracted_text, "No extracted text");
        assert_eq!(sections[0].marked_text, "No marked text");
        assert!(sections[0].error_table.is_empty());
    }

    #[test]
    fn entries_from_json_tolerate_bad_fields() {
        let good = ReportEntry::from_json(&serde_json::json!({
            "image": "a.png",
            "extractedText": "teh cat",
            "errorTable": [
                {"Incorrect Text": "teh", "Correct Text": "the", "Error Category": "Spelling"},
                {"Incorrect Text": "cat", "Correct Text": "cats", "Error Category": 7},
                "not a row"
            ]
        }));
        assert_eq!(good.image.as_deref(), Some("a.png"));
        assert_eq!(good.marked_text, None);
        assert_eq!(
            good.error_table,
            Some(vec![
                CorrectionEntry::new("teh", "the", ErrorCategory::Spelling),
                CorrectionEntry::new("cat", "cats", ErrorCategory::Grammar),
            ])
        );

        let no_table = ReportEntry::from_json(&serde_json::json!({
            "image": "a.png",
            "errorTable": "none"
        }));
        assert_eq!(no_table.image.as_deref(), Some("a.png"));
        assert_eq!(no_table.error_table, None);

        let odd_image = ReportEntry::from_json(&serde_json::json!({"image": 42}));
        assert_eq!(odd_image.image, None);
        assert_eq!(ReportEntry::from_json(&serde_json::json!("text")), ReportEntry::default());
    }

    #[test]
    fn plain_filename_rules() {
        assert!(is_plain_filename("3f2a.jpg"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename("a/b.jpg"));
        assert!(!is_plain_filename("..\\b.jpg"));
        assert!(!is_plain_filename(".."));
    }

    #[test]
    fn student_report_contains_every_part() {
        let info = StudentInfo::from_optional(Some("Ada".into()), None, Some("English".into()));
        let sections = vec![
            ReportSection {
                image_path: PathBuf::from("/srv/uploads/a.png"),
                extracted_text: "teh cat".into(),
                error_table: vec![CorrectionEntry::new("teh", "the", ErrorCategory::Spelling)],
                marked_text: "MARKED".into(),
            },
            ReportSection {
                image_path: PathBuf::from("/srv/uploads/b.png"),
                extracted_text: "fine".into(),
                error_table: vec![],
                marked_text: "fine".into(),
            },
        ];
        let html = student_report_html(&info, &sections, AnnotationStrategy::Sequential);

        assert!(html.contains("<strong>Student Name:</strong> Ada"));
        assert!(html.contains("<strong>Class:</strong> Unknown"));
        assert!(html.contains("<h2>Image 1</h2>"));
        assert!(html.contains("<h2>Image 2</h2>"));
        assert!(html.contains("src=\"/srv/uploads/a.png\""));
        assert!(html.contains("teh<sup>S</sup> cat"));
        assert!(html.contains("<td class=\"highlight-green\">the</td>"));
        assert!(html.contains("<td class=\"highlight-blue\">Spelling</td>"));
        assert!(html.contains("<p class=\"marked-text\">MARKED</p>"));
        assert!(html.contains("<p>No errors found.</p>"));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn improvement_report_layout() {
        let metrics = serde_json::json!({"word_count": 12, "avg_word_length": 4.2});
        let suggestions = Suggestions {
            style_improvements: vec!["Vary sentence length".into()],
            vocabulary_enhancements: vec![VocabularyEnhancement {
                original: "good".into(),
                suggestions: vec!["fine".into(), "solid".into()],
            }],
            structure_suggestions: vec![],
            strengths: vec!["Clear thesis".into()],
        };
        let html = improvement_report_html("line one\nline two", &metrics, &suggestions);

        assert!(html.contains("<p>line one<br>line two</p>"));
        assert!(html.contains("<li>Word Count: 12</li>"));
        assert!(html.contains("<li>Avg. Word Length: 4.2</li>"));
        assert!(html.contains("<li>Sentence Count: –</li>"));
        assert!(html.contains("<li>Vocabulary Diversity: –%</li>"));
        assert!(html.contains("<li><b>good</b> → fine, solid</li>"));
        assert!(html.contains("<h2>Strengths</h2><ul><li>Clear thesis</li></ul>"));
        assert!(html.contains("<h2>Structure Suggestions</h2><ul></ul>"));
    }
}
