//! Acceptance Policy: maps a [`MetricReport`] onto pass/fail.
//!
//! Checks run in a fixed order so the violation list, and every corrective
//! prompt built from it, is reproducible.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use strum::Display;

use crate::error::ConfigError;
use crate::metrics::{MetricReport, StructureReport};

/// Numbered steps a recipe section must have.
pub const STEP_RANGE: RangeInclusive<usize> = 6..=12;
/// Characters allowed in the `seo_title` frontmatter field.
pub const SEO_TITLE_CHARS: RangeInclusive<usize> = 10..=60;
/// Characters allowed in the `meta_description` frontmatter field.
pub const META_DESCRIPTION_CHARS: RangeInclusive<usize> = 50..=155;

/// One acceptance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Criterion {
    Blocklist,
    SentenceLengthVariance,
    TypeTokenRatio,
    FirstPersonRatio,
    NumericTokens,
    MinWords,
    MaxWords,
    SecondPerson,
    FormalAddress,
    Structure,
    OpeningFirstPerson,
    KeywordPlacement,
    SeoTitleLength,
    SeoMetaLength,
}

impl Criterion {
    /// Upper-bound criteria fail when the observed value is too high.
    pub fn is_upper_bound(self) -> bool {
        matches!(
            self,
            Self::Blocklist | Self::MaxWords | Self::FormalAddress | Self::Structure
        )
    }

    /// Range criteria fail on either side; the threshold is the bound crossed.
    pub fn is_range(self) -> bool {
        matches!(self, Self::SeoTitleLength | Self::SeoMetaLength)
    }

    /// Integer-valued criteria are printed without decimals.
    pub fn is_count(self) -> bool {
        !matches!(
            self,
            Self::SentenceLengthVariance | Self::TypeTokenRatio | Self::FirstPersonRatio
        )
    }

    pub fn format_value(self, value: f64) -> String {
        if self.is_count() {
            format!("{value:.0}")
        } else if self == Self::FirstPersonRatio {
            format!("{value:.4}")
        } else {
            format!("{value:.2}")
        }
    }
}

/// A failed check: what was measured against what was required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub criterion: Criterion,
    pub observed: f64,
    pub threshold: f64,
}

impl Violation {
    /// Whether `threshold` is a ceiling for this violation.
    pub fn exceeds_ceiling(&self) -> bool {
        self.criterion.is_upper_bound()
            || (self.criterion.is_range() && self.observed > self.threshold)
    }

    /// `type_token_ratio: 0.38 (target >= 0.45)`
    pub fn describe(&self) -> String {
        let op = if self.exceeds_ceiling() { "<=" } else { ">=" };
        format!(
            "{}: {} (target {op} {})",
            self.criterion,
            self.criterion.format_value(self.observed),
            self.criterion.format_value(self.threshold)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceVerdict {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl AcceptanceVerdict {
    pub fn violates(&self, criterion: Criterion) -> bool {
        self.violations.iter().any(|v| v.criterion == criterion)
    }
}

fn default_min_ttr() -> f64 {
    0.45
}

fn default_min_var_sentence_len() -> f64 {
    7.0
}

fn default_min_first_person() -> f64 {
    0.004
}

fn default_min_numbers() -> usize {
    3
}

/// A gap in the article layout found by [`structure_defects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureDefect {
    MissingFrontmatter,
    MissingTitle,
    /// Heading as it should appear, e.g. `### Zutaten`.
    MissingSection(String),
    /// Numbered steps found, outside [`STEP_RANGE`].
    StepCount(usize),
}

/// Layout gaps in reading order: frontmatter, H1, sections, steps.
pub fn structure_defects(structure: &StructureReport) -> Vec<StructureDefect> {
    let mut defects = Vec::new();
    if !structure.has_frontmatter {
        defects.push(StructureDefect::MissingFrontmatter);
    }
    if !structure.has_title {
        defects.push(StructureDefect::MissingTitle);
    }
    defects.extend(
        structure
            .missing_sections
            .iter()
            .cloned()
            .map(StructureDefect::MissingSection),
    );
    if !STEP_RANGE.contains(&structure.numbered_steps) {
        defects.push(StructureDefect::StepCount(structure.numbered_steps));
    }
    defects
}

/// Acceptance thresholds. The word-count, address-form and article-layout
/// checks are optional and disabled unless configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_min_ttr")]
    pub min_ttr: f64,
    #[serde(default = "default_min_var_sentence_len")]
    pub min_var_sentence_len: f64,
    /// First-person pronouns per word.
    #[serde(default = "default_min_first_person")]
    pub min_first_person: f64,
    #[serde(default = "default_min_numbers")]
    pub min_numbers: usize,
    #[serde(default)]
    pub max_blocklist_hits: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_words: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_second_person: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_formal_address: Option<usize>,
    /// Frontmatter, H1, the recipe sections and 6-12 numbered steps.
    #[serde(default)]
    pub require_structure: bool,
    /// "ich" (or an inflection) within the first 100 words.
    #[serde(default)]
    pub require_opening_first_person: bool,
    /// Keyword in the H1 and the first 100 words. Needs a keyword.
    #[serde(default)]
    pub require_keyword_placement: bool,
    /// `seo_title` and `meta_description` lengths.
    #[serde(default)]
    pub check_seo_lengths: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_ttr: default_min_ttr(),
            min_var_sentence_len: default_min_var_sentence_len(),
            min_first_person: default_min_first_person(),
            min_numbers: default_min_numbers(),
            max_blocklist_hits: 0,
            min_words: None,
            max_words: None,
            min_second_person: None,
            max_formal_address: None,
            require_structure: false,
            require_opening_first_person: false,
            require_keyword_placement: false,
            check_seo_lengths: false,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("min_ttr", self.min_ttr),
            ("min_var_sentence_len", self.min_var_sentence_len),
            ("min_first_person", self.min_first_person),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "thresholds.{name} must be a non-negative number"
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.min_words, self.max_words)
            && min > max
        {
            return Err(ConfigError::Validation(format!(
                "thresholds.min_words ({min}) exceeds thresholds.max_words ({max})"
            )));
        }

        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

/// The bound `value` crosses, if any.
fn crossed_bound(value: usize, range: &RangeInclusive<usize>) -> Option<usize> {
    if value < *range.start() {
        Some(*range.start())
    } else if value > *range.end() {
        Some(*range.end())
    } else {
        None
    }
}

/// Judge a report. `passed` is true iff no check fails.
pub fn evaluate(report: &MetricReport, thresholds: &Thresholds) -> AcceptanceVerdict {
    let mut violations = Vec::new();
    let mut fail = |criterion, observed: f64, threshold: f64| {
        violations.push(Violation {
            criterion,
            observed,
            threshold,
        });
    };

    if report.blocklist_hits.len() > thresholds.max_blocklist_hits {
        fail(
            Criterion::Blocklist,
            as_f64(report.blocklist_hits.len()),
            as_f64(thresholds.max_blocklist_hits),
        );
    }
    if report.sentence_length_variance < thresholds.min_var_sentence_len {
        fail(
            Criterion::SentenceLengthVariance,
            report.sentence_length_variance,
            thresholds.min_var_sentence_len,
        );
    }
    if report.type_token_ratio < thresholds.min_ttr {
        fail(
            Criterion::TypeTokenRatio,
            report.type_token_ratio,
            thresholds.min_ttr,
        );
    }
    if report.first_person_ratio < thresholds.min_first_person {
        fail(
            Criterion::FirstPersonRatio,
            report.first_person_ratio,
            thresholds.min_first_person,
        );
    }
    if report.numeric_token_count < thresholds.min_numbers {
        fail(
            Criterion::NumericTokens,
            as_f64(report.numeric_token_count),
            as_f64(thresholds.min_numbers),
        );
    }

    if let Some(min) = thresholds.min_words
        && report.word_count < min
    {
        fail(Criterion::MinWords, as_f64(report.word_count), as_f64(min));
    }
    if let Some(max) = thresholds.max_words
        && report.word_count > max
    {
        fail(Criterion::MaxWords, as_f64(report.word_count), as_f64(max));
    }
    if let Some(min) = thresholds.min_second_person
        && report.second_person_count < min
    {
        fail(
            Criterion::SecondPerson,
            as_f64(report.second_person_count),
            as_f64(min),
        );
    }
    if let Some(max) = thresholds.max_formal_address
        && report.formal_address_count > max
    {
        fail(
            Criterion::FormalAddress,
            as_f64(report.formal_address_count),
            as_f64(max),
        );
    }

    let structure = &report.structure;
    if thresholds.require_structure {
        let defects = structure_defects(structure);
        if !defects.is_empty() {
            fail(Criterion::Structure, as_f64(defects.len()), 0.0);
        }
    }
    if thresholds.require_opening_first_person && !structure.first_person_in_opening {
        fail(Criterion::OpeningFirstPerson, 0.0, 1.0);
    }
    // Skipped when the run has no keyword.
    if thresholds.require_keyword_placement
        && let (Some(in_title), Some(in_opening)) =
            (structure.keyword_in_title, structure.keyword_in_opening)
    {
        let placed = usize::from(in_title) + usize::from(in_opening);
        if placed < 2 {
            fail(Criterion::KeywordPlacement, as_f64(placed), 2.0);
        }
    }
    if thresholds.check_seo_lengths {
        if let Some(bound) = crossed_bound(structure.seo_title_chars, &SEO_TITLE_CHARS) {
            fail(
                Criterion::SeoTitleLength,
                as_f64(structure.seo_title_chars),
                as_f64(bound),
            );
        }
        if let Some(bound) =
            crossed_bound(structure.meta_description_chars, &META_DESCRIPTION_CHARS)
        {
            fail(
                Criterion::SeoMetaLength,
                as_f64(structure.meta_description_chars),
                as_f64(bound),
            );
        }
    }

    AcceptanceVerdict {
        passed: violations.is_empty(),
        violations,
    }
}
