//! Data model shared by the pipeline, the session store and the HTTP layer.
//!
//! JSON field names follow what the web client already consumes: the error
//! table uses the human-readable column names (`"Incorrect Text"` …) while
//! the surrounding records are camelCase.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Category of a flagged error. Always exactly one of the two variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ErrorCategory {
    Spelling,
    #[default]
    Grammar,
}

impl ErrorCategory {
    /// Classify a free-text label: anything mentioning "spell"
    /// (case-insensitive) is spelling, everything else grammar.
    pub fn classify(label: &str) -> Self {
        if label.to_lowercase().contains("spell") {
            ErrorCategory::Spelling
        } else {
            ErrorCategory::Grammar
        }
    }

    /// Superscript tag used in printed reports.
    pub fn superscript_tag(self) -> &'static str {
        match self {
            ErrorCategory::Spelling => "S",
            ErrorCategory::Grammar => "G",
        }
    }

    /// Inline highlight colour used for on-screen display.
    pub fn highlight_colour(self) -> &'static str {
        match self {
            ErrorCategory::Spelling => "red",
            ErrorCategory::Grammar => "blue",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Spelling => f.write_str("Spelling"),
            ErrorCategory::Grammar => f.write_str("Grammar"),
        }
    }
}

impl From<&str> for ErrorCategory {
    fn from(label: &str) -> Self {
        Self::classify(label)
    }
}

// Client-supplied tables may carry any label; re-classify instead of rejecting.
impl<'de> Deserialize<'de> for ErrorCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Self::from).unwrap_or_default())
    }
}

/// One row of the normalized error table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorrectionEntry {
    #[serde(rename = "Incorrect Text", alias = "incorrectText", default)]
    pub incorrect: String,
    #[serde(rename = "Correct Text", alias = "correctText", default)]
    pub correct: String,
    #[serde(rename = "Error Category", alias = "errorCategory", default)]
    pub category: ErrorCategory,
}

impl CorrectionEntry {
    pub fn new(
        incorrect: impl Into<String>,
        correct: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            incorrect: incorrect.into(),
            correct: correct.into(),
            category,
        }
    }
}

/// Outcome of grading one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Stored filename under the upload directory.
    pub image: String,
    pub extracted_text: String,
    pub error_table: Vec<CorrectionEntry>,
    /// Extracted text with highlight spans.
    pub marked_text: String,
}

/// Everything produced by one upload call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBatch {
    pub student_name: Option<String>,
    pub student_class: Option<String>,
    pub subject: Option<String>,
    pub results: Vec<ExtractionResult>,
}

/// Language tag attached to complexity metrics and used to pick the
/// response language for suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
}

impl Language {
    /// Parse an ISO-639-1 code or an English language name.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphabetic())
            .to_lowercase();
        match code.as_str() {
            "en" | "eng" | "english" => Some(Language::English),
            "de" | "deu" | "ger" | "german" | "deutsch" => Some(Language::German),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::German => "German",
        }
    }
}

/// Simple readability statistics over a free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    pub avg_word_length: f64,
    /// Unique words over total words, as a percentage.
    pub vocabulary_diversity: f64,
    /// Up to five `(word, count)` pairs, most frequent first.
    pub common_words: Vec<(String, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

/// A word and its suggested replacements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VocabularyEnhancement {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Writing-improvement report returned by the Gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub style_improvements: Vec<String>,
    #[serde(default)]
    pub vocabulary_enhancements: Vec<VocabularyEnhancement>,
    #[serde(default)]
    pub structure_suggestions: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

impl Suggestions {
    /// Substitute used whenever the Gateway cannot produce suggestions.
    pub fn placeholder() -> Self {
        Self {
            style_improvements: vec!["Error generating style suggestions".to_string()],
            vocabulary_enhancements: Vec::new(),
            structure_suggestions: vec!["Error generating structure suggestions".to_string()],
            strengths: vec!["Text analysis unavailable".to_string()],
        }
    }
}

/// Metrics plus suggestions, as returned by `/get_improvements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub complexity_metrics: ComplexityMetrics,
    pub improvement_suggestions: Suggestions,
}
