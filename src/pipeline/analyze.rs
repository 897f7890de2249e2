//! Free-text analysis: complexity metrics, language detection and
//! writing-improvement suggestions.
//!
//! Metrics are deliberately naive (split on `.!?` runs and whitespace) and
//! fully deterministic. Suggestions come from the gateway; any failure there
//! is absorbed and replaced by [`Suggestions::placeholder`].

use crate::model::{ComplexityMetrics, Improvements, Language, Suggestions, VocabularyEnhancement};
use crate::pipeline::gateway::Gateway;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*)\n```\s*$").unwrap());

/// Compute complexity metrics for a text.
pub fn analyze_complexity(text: &str) -> ComplexityMetrics {
    let sentence_count = RE_SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();
    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();

    let avg_words_per_sentence = word_count as f64 / sentence_count.max(1) as f64;
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_word_length = total_chars as f64 / word_count.max(1) as f64;

    let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let vocabulary_diversity = unique.len() as f64 / word_count.max(1) as f64;

    ComplexityMetrics {
        word_count,
        sentence_count,
        avg_words_per_sentence: round1(avg_words_per_sentence),
        avg_word_length: round1(avg_word_length),
        vocabulary_diversity: round1(vocabulary_diversity * 100.0),
        common_words: most_common_words(&words, 5),
        language: None,
    }
}

/// Most frequent lowercase words longer than three characters.
/// Ties keep first-occurrence order.
fn most_common_words(words: &[&str], n: usize) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in words.iter().filter(|w| w.chars().count() > 3) {
        let lower = word.to_lowercase();
        let count = counts.entry(lower.clone()).or_insert(0);
        if *count == 0 {
            order.push(lower);
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|w| {
            let c = counts[&w];
            (w, c)
        })
        .collect();
    // Stable sort keeps first-occurrence order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ── Language detection ───────────────────────────────────────────────────

const ENGLISH_KEYWORDS: &[&str] = &[
    "the", "and", "is", "are", "was", "of", "to", "in", "it", "that", "with", "not", "have",
];

const GERMAN_KEYWORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "sind", "war", "nicht", "ich", "mit", "ein", "eine", "zu",
];

/// Guess the language by counting common function words.
/// English wins ties, including texts with no keywords at all.
pub fn detect_language_heuristic(text: &str) -> Language {
    let mut english = 0usize;
    let mut german = 0usize;
    for word in text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
    {
        let lower = word.to_lowercase();
        if ENGLISH_KEYWORDS.contains(&lower.as_str()) {
            english += 1;
        }
        if GERMAN_KEYWORDS.contains(&lower.as_str()) {
            german += 1;
        }
    }
    if german > english {
        Language::German
    } else {
        Language::English
    }
}

/// Ask the gateway for the language, falling back to the keyword heuristic.
pub async fn detect_language(gateway: &dyn Gateway, text: &str) -> Language {
    match gateway.detect_language(text).await {
        Ok(answer) => Language::from_code(&answer).unwrap_or_else(|| {
            debug!("Unrecognised language answer {:?}; using heuristic", answer);
            detect_language_heuristic(text)
        }),
        Err(e) => {
            warn!("Language detection failed, using heuristic: {}", e);
            detect_language_heuristic(text)
        }
    }
}

// ── Suggestions ──────────────────────────────────────────────────────────

/// Fetch suggestions, substituting the placeholder on any failure.
pub async fn generate_suggestions(
    gateway: &dyn Gateway,
    text: &str,
    language: Language,
) -> Suggestions {
    match gateway.suggest_improvements(text, language).await {
        Ok(raw) => parse_suggestions(&raw).unwrap_or_else(|| {
            warn!("Unparsable suggestions from gateway; using placeholder");
            debug!("Raw suggestions: {}", raw);
            Suggestions::placeholder()
        }),
        Err(e) => {
            warn!("Suggestion generation failed, using placeholder: {}", e);
            Suggestions::placeholder()
        }
    }
}

/// Vocabulary entries arrive either as objects or as bare words.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseVocabulary {
    Entry(VocabularyEnhancement),
    Word(String),
}

#[derive(Deserialize)]
struct LooseSuggestions {
    #[serde(default)]
    style_improvements: Vec<String>,
    #[serde(default)]
    vocabulary_enhancements: Vec<LooseVocabulary>,
    #[serde(default)]
    structure_suggestions: Vec<String>,
    #[serde(default)]
    strengths: Vec<String>,
}

/// Parse a gateway suggestions answer, tolerating a surrounding code fence.
///
/// Returns `None` when the content is not a JSON object of the expected shape.
pub fn parse_suggestions(raw: &str) -> Option<Suggestions> {
    let trimmed = raw.trim();
    let body = RE_JSON_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let loose: LooseSuggestions = serde_json::from_str(body).ok()?;
    Some(Suggestions {
        style_improvements: loose.style_improvements,
        vocabulary_enhancements: loose
            .vocabulary_enhancements
            .into_iter()
            .map(|v| match v {
                LooseVocabulary::Entry(e) => e,
                LooseVocabulary::Word(original) => VocabularyEnhancement {
                    original,
                    suggestions: Vec::new(),
                },
            })
            .collect(),
        structure_suggestions: loose.structure_suggestions,
        strengths: loose.strengths,
    })
}

/// Full analysis: metrics, detected language, and suggestions.
pub async fn analyze(gateway: &dyn Gateway, text: &str) -> Improvements {
    let mut complexity_metrics = analyze_complexity(text);
    let language = detect_language(gateway, text).await;
    complexity_metrics.language = Some(language);
    let improvement_suggestions = generate_suggestions(gateway, text, language).await;
    Improvements {
        complexity_metrics,
        improvement_suggestions,
    }
}
