//! Text annotation: mark flagged words for display and for print.
//!
//! Two modes over the same `(text, table)` input:
//!
//! * **Highlight** wraps each occurrence in a coloured `<span>` (red for
//!   spelling, blue for grammar) for the web client.
//! * **Superscript** appends `<sup>S</sup>` / `<sup>G</sup>` after each
//!   occurrence for the printed report.
//!
//! Matching is literal and case-sensitive and replaces every occurrence.
//! Under [`AnnotationStrategy::Sequential`] rows are applied one after the
//! other to the growing output, so a later row can match inside markup
//! inserted by an earlier one. Existing reports depend on that output, so it
//! stays the default. [`AnnotationStrategy::NonOverlapping`] locates matches
//! in the original text only.

use crate::config::AnnotationStrategy;
use crate::model::{CorrectionEntry, ErrorCategory};

/// Wrap every flagged occurrence in a coloured span.
pub fn highlight(text: &str, table: &[CorrectionEntry], strategy: AnnotationStrategy) -> String {
    annotate(text, table, strategy, |matched, category| {
        format!(
            "<span style=\"color:{};\">{}</span>",
            category.highlight_colour(),
            matched
        )
    })
}

/// Append a category superscript after every flagged occurrence.
pub fn superscript(
    text: &str,
    table: &[CorrectionEntry],
    strategy: AnnotationStrategy,
) -> String {
    annotate(text, table, strategy, |matched, category| {
        format!("{}<sup>{}</sup>", matched, category.superscript_tag())
    })
}

fn annotate<F>(
    text: &str,
    table: &[CorrectionEntry],
    strategy: AnnotationStrategy,
    render: F,
) -> String
where
    F: Fn(&str, ErrorCategory) -> String,
{
    match strategy {
        AnnotationStrategy::Sequential => table
            .iter()
            .filter(|e| !e.incorrect.is_empty())
            .fold(text.to_string(), |acc, e| {
                acc.replace(&e.incorrect, &render(&e.incorrect, e.category))
            }),
        AnnotationStrategy::NonOverlapping => annotate_non_overlapping(text, table, render),
    }
}

/// Find all matches in the original text, keep the leftmost (longest on a
/// tie, earliest row on a further tie) and drop any that overlap a kept one.
fn annotate_non_overlapping<F>(text: &str, table: &[CorrectionEntry], render: F) -> String
where
    F: Fn(&str, ErrorCategory) -> String,
{
    let mut spans: Vec<(usize, usize, usize)> = Vec::new();
    for (row, entry) in table.iter().enumerate() {
        if entry.incorrect.is_empty() {
            continue;
        }
        for (start, m) in text.match_indices(entry.incorrect.as_str()) {
            spans.push((start, start + m.len(), row));
        }
    }
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

    let mut out = String::with_capacity(text.len() + spans.len() * 32);
    let mut cursor = 0;
    for (start, end, row) in spans {
        if start < cursor {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&render(&text[start..end], table[row].category));
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQ: AnnotationStrategy = AnnotationStrategy::Sequential;
    const NON: AnnotationStrategy = AnnotationStrategy::NonOverlapping;

    fn spelling(w: &str) -> CorrectionEntry {
        CorrectionEntry::new(w, "", ErrorCategory::Spelling)
    }

    fn grammar(w: &str) -> CorrectionEntry {
        CorrectionEntry::new(w, "", ErrorCategory::Grammar)
    }

    fn strip_sup(s: &str) -> String {
        s.replace("<sup>S</sup>", "").replace("<sup>G</sup>", "")
    }

    #[test]
    fn highlight_wraps_all_occurrences() {
        let out = highlight("teh cat and teh dog", &[spelling("teh")], SEQ);
        assert_eq!(
            out,
            "<span style=\"color:red;\">teh</span> cat and <span style=\"color:red;\">teh</span> dog"
        );
    }

    #[test]
    fn highlight_grammar_is_blue() {
        let out = highlight("he go home", &[grammar("he go")], SEQ);
        assert_eq!(out, "<span style=\"color:blue;\">he go</span> home");
    }

    #[test]
    fn highlight_is_case_sensitive() {
        let out = highlight("Teh end", &[spelling("teh")], SEQ);
        assert_eq!(out, "Teh end");
    }

    #[test]
    fn no_matches_leaves_text_unchanged() {
        let text = "Everything here is fine.";
        let table = [spelling("teh"), grammar("he go")];
        for strategy in [SEQ, NON] {
            assert_eq!(highlight(text, &table, strategy), text);
            assert_eq!(superscript(text, &table, strategy), text);
        }
    }

    #[test]
    fn empty_incorrect_text_is_ignored() {
        let text = "abc";
        assert_eq!(highlight(text, &[spelling("")], SEQ), text);
        assert_eq!(superscript(text, &[grammar("")], NON), text);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let out = highlight("cost (approx.) $5", &[grammar("(approx.)")], SEQ);
        assert_eq!(
            out,
            "cost <span style=\"color:blue;\">(approx.)</span> $5"
        );
    }

    #[test]
    fn sequential_rows_can_rewrap() {
        // The second row matches inside the first row's output.
        let out = highlight("recieve", &[spelling("recieve"), grammar("ie")], SEQ);
        assert_eq!(
            out,
            "<span style=\"color:red;\">rec<span style=\"color:blue;\">ie</span>ve</span>"
        );
    }

    #[test]
    fn non_overlapping_prefers_leftmost_longest() {
        let out = highlight("recieve", &[grammar("ie"), spelling("recieve")], NON);
        assert_eq!(out, "<span style=\"color:red;\">recieve</span>");
    }

    #[test]
    fn superscript_appends_tag() {
        let table = [spelling("teh"), grammar("go")];
        let out = superscript("teh dog go home", &table, SEQ);
        assert_eq!(out, "teh<sup>S</sup> dog go<sup>G</sup> home");
    }

    #[test]
    fn superscript_preserves_original_characters() {
        let text = "I has went to teh store, teh end.";
        let table = [grammar("has went"), spelling("teh"), spelling("store")];
        for strategy in [SEQ, NON] {
            assert_eq!(strip_sup(&superscript(text, &table, strategy)), text);
        }
    }
}
