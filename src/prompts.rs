//! Prompts sent to the language-model gateway.
//!
//! Every prompt lives here so the gateway module only deals with message
//! assembly and error mapping, and so tests can inspect the exact wording
//! the normalizer and analyzer depend on (the `->` separator, the JSON keys).

/// Instruction sent alongside the image when transcribing handwriting.
pub const EXTRACTION_PROMPT: &str =
    "Extract the text from this image without modifying spelling or grammar.";

/// System prompt for the spelling/grammar critique.
///
/// The normalizer expects one finding per line in the form
/// `Incorrect -> Correct -> Category`.
pub const CORRECTION_SYSTEM_PROMPT: &str = "You are an expert in spelling and grammar correction. \
Identify errors and provide corrections in 'Incorrect -> Correct -> Category' format.";

/// Build the user turn for the correction call.
pub fn correction_request(text: &str) -> String {
    format!(
        "Review the following text: '{}' and identify spelling and grammar mistakes.",
        text
    )
}

/// System prompt for the writing-improvement report.
///
/// The JSON keys must match [`crate::model::Suggestions`].
pub const SUGGESTIONS_SYSTEM_PROMPT: &str = r#"You are an expert writing coach. Analyze the text and provide:
1. Style Improvements: Suggest 3 specific ways to improve writing style (clarity, conciseness, tone)
2. Vocabulary Enhancements: Identify 3-5 words that could be replaced with more precise or sophisticated alternatives
3. Structure Suggestions: Recommend improvements to paragraph structure, transitions, or flow
4. Strengths: Note 2 positive aspects of the writing

Format your response as a structured JSON object with exactly these keys:
{
  "style_improvements": ["..."],
  "vocabulary_enhancements": [{"original": "...", "suggestions": ["...", "..."]}],
  "structure_suggestions": ["..."],
  "strengths": ["..."]
}
Output ONLY the JSON object."#;

/// Build the user turn for the suggestions call.
pub fn suggestions_request(text: &str, language_name: &str) -> String {
    format!(
        "Analyze this text and write all suggestions in {}: {}",
        language_name, text
    )
}

/// System prompt for language detection.
pub const LANGUAGE_SYSTEM_PROMPT: &str = "Identify the language of the text. \
Answer with the two-letter ISO 639-1 code only, for example 'en' or 'de'.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_prompt_names_separator() {
        assert!(CORRECTION_SYSTEM_PROMPT.contains("Incorrect -> Correct -> Category"));
    }

    #[test]
    fn suggestions_prompt_names_every_key() {
        for key in [
            "style_improvements",
            "vocabulary_enhancements",
            "structure_suggestions",
            "strengths",
        ] {
            assert!(SUGGESTIONS_SYSTEM_PROMPT.contains(key), "missing {key}");
        }
    }

    #[test]
    fn requests_embed_text() {
        assert!(correction_request("I has a dog").contains("'I has a dog'"));
        assert!(suggestions_request("Hallo", "German").contains("in German: Hallo"));
    }
}
