//! Error-table normalization: turn the gateway's loosely structured
//! correction output into a strict `Vec<CorrectionEntry>`.
//!
//! The model is asked for `incorrect -> correct -> category` lines but
//! routinely adds preambles, numbering, blank lines and closing remarks.
//! Everything that is not a clean three-field row is dropped silently; the
//! worst case is an empty table, never an error.

use crate::model::{CorrectionEntry, ErrorCategory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separator between the three fields of a correction line.
pub const SEPARATOR: &str = "->";

/// Raw correction output as returned by a [`crate::pipeline::gateway::Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCorrections {
    /// Already split into rows. Accepted only if every row has three fields.
    Rows(Vec<Vec<String>>),
    /// One candidate correction per line.
    Text(String),
}

static RE_ENUMERATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").unwrap());

/// Normalize raw correction output into the canonical error table.
///
/// Row order is preserved. The category of every row is recomputed from its
/// label, so feeding an already-normalized table back in is a no-op.
pub fn normalize(raw: &RawCorrections) -> Vec<CorrectionEntry> {
    let rows: Vec<[&str; 3]> = match raw {
        RawCorrections::Text(text) => text.lines().filter_map(split_line).collect(),
        RawCorrections::Rows(rows) => {
            if !rows.iter().all(|r| r.len() == 3) {
                return Vec::new();
            }
            rows.iter()
                .map(|r| [r[0].trim(), r[1].trim(), r[2].trim()])
                .collect()
        }
    };

    rows.into_iter()
        .map(|[incorrect, correct, label]| {
            CorrectionEntry::new(
                RE_ENUMERATION.replace(incorrect, "").into_owned(),
                correct,
                ErrorCategory::from(label),
            )
        })
        .collect()
}

/// Split one line into exactly three trimmed fields, or reject it.
fn split_line(line: &str) -> Option<[&str; 3]> {
    if !line.contains(SEPARATOR) {
        return None;
    }
    let parts: Vec<&str> = line.split(SEPARATOR).collect();
    match parts.as_slice() {
        [a, b, c] => Some([a.trim(), b.trim(), c.trim()]),
        _ => None,
    }
}

/// Re-normalize a table (e.g. one supplied by a client).
pub fn renormalize(table: &[CorrectionEntry]) -> Vec<CorrectionEntry> {
    let rows = table
        .iter()
        .map(|e| vec![e.incorrect.clone(), e.correct.clone(), e.category.to_string()])
        .collect();
    normalize(&RawCorrections::Rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCorrections {
        RawCorrections::Text(s.to_string())
    }

    #[test]
    fn numbered_line_is_stripped_and_classified() {
        let table = normalize(&text("1. teh -> the -> Spelling mistake"));
        assert_eq!(
            table,
            vec![CorrectionEntry::new("teh", "the", ErrorCategory::Spelling)]
        );
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let raw = "Here are the errors I found:\n\
                   1. teh -> the -> Spelling\n\
                   \n\
                   2. go -> went\n\
                   3. a -> b -> c -> d\n\
                   4. he go -> he goes -> Subject-verb agreement\n\
                   Let me know if you need anything else!";
        let table = normalize(&text(raw));
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].incorrect, "teh");
        assert_eq!(table[1].incorrect, "he go");
        assert_eq!(table[1].category, ErrorCategory::Grammar);
    }

    #[test]
    fn row_count_never_exceeds_well_formed_lines() {
        let lines = [
            "x -> y -> Spelling",
            "no separator",
            "a -> b",
            "p -> q -> Grammar",
            "-> -> ",
            "1 -> 2 -> 3 -> 4",
        ];
        let well_formed = lines
            .iter()
            .filter(|l| l.contains("->") && l.split("->").count() == 3)
            .count();
        let table = normalize(&text(&lines.join("\n")));
        assert_eq!(table.len(), well_formed);
    }

    #[test]
    fn prefix_only_stripped_from_first_field() {
        let table = normalize(&text("2. teh -> 3. the -> 4. spelling"));
        assert_eq!(table[0].incorrect, "teh");
        assert_eq!(table[0].correct, "3. the");
        assert_eq!(table[0].category, ErrorCategory::Spelling);
    }

    #[test]
    fn empty_and_garbage_input_give_empty_table() {
        assert!(normalize(&text("")).is_empty());
        assert!(normalize(&text("No errors found.")).is_empty());
    }

    #[test]
    fn rows_with_wrong_arity_give_empty_table() {
        let raw = RawCorrections::Rows(vec![
            vec!["teh".into(), "the".into(), "Spelling".into()],
            vec!["only".into(), "two".into()],
        ]);
        assert!(normalize(&raw).is_empty());
    }

    #[test]
    fn rows_are_normalized_in_order() {
        let raw = RawCorrections::Rows(vec![
            vec!["1. teh".into(), "the".into(), "spelling error".into()],
            vec!["was".into(), "were".into(), "agreement".into()],
        ]);
        let table = normalize(&raw);
        assert_eq!(table[0], CorrectionEntry::new("teh", "the", ErrorCategory::Spelling));
        assert_eq!(table[1], CorrectionEntry::new("was", "were", ErrorCategory::Grammar));
    }

    #[test]
    fn renormalize_is_idempotent() {
        let table = normalize(&text("teh -> the -> Spelling\nis -> are -> Grammar"));
        assert_eq!(renormalize(&table), table);
        assert_eq!(renormalize(&renormalize(&table)), table);
    }

    #[test]
    fn untagged_deserialization() {
        let rows: RawCorrections = serde_json::from_str(r#"[["a","b","Spelling"]]"#).unwrap();
        assert!(matches!(rows, RawCorrections::Rows(_)));
        let text: RawCorrections = serde_json::from_str(r#""a -> b -> Grammar""#).unwrap();
        assert!(matches!(text, RawCorrections::Text(_)));
    }
}
