//! Metric Evaluator: deterministic text signals for "does this read like a
//! person wrote it".
//!
//! Every signal is computed from one tokenization, fixed here because the
//! acceptance thresholds are tuned against it:
//!
//! - a **word** is a maximal run of alphanumeric characters
//!   (`char::is_alphanumeric`, so umlauts and `ß` are letters), compared
//!   lowercased;
//! - a **sentence** ends at `.`, `!`, `?`, `…` or a line break; segments
//!   without words are skipped (a decimal point also ends a sentence);
//! - a **numeric token** is a word containing at least one ASCII digit
//!   `0`-`9` (superscripts such as the `²` in `m²` do not count).
//!
//! [`evaluate`] is a pure function of the text and the blocklist. Article
//! layout (headings, steps, frontmatter) lives in [`structure`].

pub mod structure;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::style::Blocklist;

pub use structure::StructureReport;

/// First-person singular and plural pronouns, all inflections.
const FIRST_PERSON: [&str; 17] = [
    "ich", "mich", "mir", "mein", "meine", "meinem", "meinen", "meiner", "meines", "wir", "uns",
    "unser", "unsere", "unserem", "unseren", "unserer", "unseres",
];

/// Informal second-person address ("du" form).
const SECOND_PERSON: [&str; 9] = [
    "du", "dich", "dir", "dein", "deine", "deinen", "deinem", "deiner", "deines",
];

/// Formal address, matched case-sensitively on the token as written.
const FORMAL_ADDRESS: [&str; 8] = [
    "Sie", "Ihnen", "Ihr", "Ihre", "Ihrem", "Ihren", "Ihrer", "Ihres",
];

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '\n')
}

/// Split `text` into word tokens, preserving case.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Word count of every non-empty sentence, in order.
pub fn sentence_lengths(text: &str) -> Vec<usize> {
    text.split(is_sentence_end)
        .map(|s| tokenize(s).len())
        .filter(|&n| n > 0)
        .collect()
}

/// Population variance of sentence lengths; 0 with fewer than two sentences.
pub fn sentence_length_variance(lengths: &[usize]) -> f64 {
    if lengths.len() < 2 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let values: Vec<f64> = lengths.iter().map(|&n| n as f64).collect();
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Signals measured on one candidate text. Recomputed on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    /// Distinct blocklist phrases found (configured spelling, sorted).
    pub blocklist_hits: BTreeSet<String>,
    pub sentence_length_variance: f64,
    pub type_token_ratio: f64,
    pub first_person_ratio: f64,
    pub numeric_token_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub second_person_count: usize,
    pub formal_address_count: usize,
    pub structure: StructureReport,
}

/// Measure `text`. No side effects, no hidden state.
pub fn evaluate(text: &str, blocklist: &Blocklist) -> MetricReport {
    evaluate_with_keyword(text, blocklist, None)
}

/// Like [`evaluate`], also locating `keyword` in the title and opening.
pub fn evaluate_with_keyword(
    text: &str,
    blocklist: &Blocklist,
    keyword: Option<&str>,
) -> MetricReport {
    let tokens = tokenize(text);
    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let total = lowered.len();

    let distinct: HashSet<&str> = lowered.iter().map(String::as_str).collect();
    let first_person = lowered
        .iter()
        .filter(|t| FIRST_PERSON.contains(&t.as_str()))
        .count();
    let second_person = lowered
        .iter()
        .filter(|t| SECOND_PERSON.contains(&t.as_str()))
        .count();
    let formal_address = tokens
        .iter()
        .filter(|t| FORMAL_ADDRESS.contains(t))
        .count();
    let numeric = tokens
        .iter()
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .count();

    let lengths = sentence_lengths(text);

    MetricReport {
        blocklist_hits: blocklist.find_in(text),
        sentence_length_variance: sentence_length_variance(&lengths),
        type_token_ratio: ratio(distinct.len(), total),
        first_person_ratio: ratio(first_person, total),
        numeric_token_count: numeric,
        word_count: total,
        sentence_count: lengths.len(),
        second_person_count: second_person,
        formal_address_count: formal_address,
        structure: structure::analyze(text, keyword),
    }
}
