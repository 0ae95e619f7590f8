//! Style guide and blocklist.
//!
//! Both are static configuration: loaded once, shared read-only across runs
//! (`Arc<StyleGuide>`), and passed to the model verbatim. Nothing here parses
//! the rules semantically.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Forbidden phrases that mark generic, machine-sounding prose.
///
/// Matching is a case-insensitive substring scan. Empty entries and
/// case-insensitive duplicates are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Blocklist {
    phrases: Vec<String>,
    lowered: Vec<String>,
}

impl Blocklist {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut kept = Vec::new();
        let mut lowered = Vec::new();
        for phrase in phrases {
            let phrase: String = phrase.into();
            let trimmed = phrase.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();
            if seen.insert(lower.clone()) {
                kept.push(trimmed.to_string());
                lowered.push(lower);
            }
        }
        Self {
            phrases: kept,
            lowered,
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Distinct configured phrases found anywhere in `text`, any case.
    pub fn find_in(&self, text: &str) -> BTreeSet<String> {
        let haystack = text.to_lowercase();
        self.phrases
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lower)| haystack.contains(lower.as_str()))
            .map(|(phrase, _)| phrase.clone())
            .collect()
    }

    /// Comma-separated list for prompts.
    pub fn joined(&self) -> String {
        self.phrases.join(", ")
    }
}

impl From<Vec<String>> for Blocklist {
    fn from(phrases: Vec<String>) -> Self {
        Self::new(phrases)
    }
}

impl From<Blocklist> for Vec<String> {
    fn from(list: Blocklist) -> Self {
        list.phrases
    }
}

/// Writing rules handed to the model, plus the blocklist the evaluator
/// enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleGuide {
    /// System prompt for every completion call.
    pub persona: String,
    /// Opening line of the guide (voice, site, register).
    pub preamble: String,
    /// Ordered natural-language rules.
    pub rules: Vec<String>,
    /// Tone reference excerpts shown to the style editor.
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub blocklist: Blocklist,
}

impl Default for StyleGuide {
    fn default() -> Self {
        Self::german_camp_cooking()
    }
}

impl StyleGuide {
    /// Built-in guide for German outdoor-cooking recipe articles.
    pub fn german_camp_cooking() -> Self {
        Self {
            persona: "Du bist Redakteurin für camp-kochen.de.\n\
                      Deine Aufgabe: hilfreiche, konkrete, persönliche Texte mit natürlichem Rhythmus verfassen.\n\
                      Halte den folgenden Stilguide strikt ein."
                .into(),
            preamble: "Schreibe wie „camp-kochen.de“: pragmatisch, persönlich, ohne Füllfloskeln."
                .into(),
            rules: vec![
                "Perspektive: Ich/Wir beim Draußen-Kochen, kleine Beobachtungen. Gegenüber duzen."
                    .into(),
                "Variiere Satzlängen. Kurze Sätze sind erlaubt.".into(),
                "Konkrete Details (Mengen, Zeiten, Geräusche/Anfühlen), keine Leerphrasen.".into(),
                "Nutze aktive Verben. Keine Aufzählungshölle.".into(),
                "SEO: 1 prägnante H2, 2–3 H3; Keywords natürlich einbinden, kein Keyword-Stuffing."
                    .into(),
                "Ton: unaufgeregt, modern, minimalistisch.".into(),
            ],
            examples: vec![
                "Ähnlich wie beim Hefeteig lese ich bei Lesern häufig, dass sie sich bis dato nicht recht an Brandteig heran trauen. Ich verstehe das ja. Aber nein, bitte bleibt am Ball, das wird."
                    .into(),
                "Beim Backen kann die gebundene Feuchtigkeit nicht als Wasserdampf durch die Kruste entweichen, es entstehen Hohlräume, die das Gebäck schön aufplustern. So kommt der Kuchen auch zu seinem Gebirge, bevor ein Schneesturm aus Puderzucker darüber herfällt."
                    .into(),
            ],
            blocklist: Blocklist::new([
                "In diesem Artikel",
                "abschließend",
                "insgesamt",
                "innovativ",
                "köstlich",
                "einfach zuzubereiten",
                "im Folgenden",
                "es ist wichtig zu beachten",
                "nachstehend",
                "zusammenfassend",
                "Fazit",
            ]),
        }
    }

    /// Load a guide from a TOML file with the same shape as this struct.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read style guide {}", path.display()))?;
        let guide: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse style guide {}", path.display()))?;
        Ok(guide)
    }

    /// The guide as prompt text: preamble, rules, then the phrases to avoid.
    pub fn render(&self) -> String {
        let mut out = self.preamble.trim().to_string();
        for rule in &self.rules {
            let _ = write!(out, "\n- {}", rule.trim());
        }
        if !self.blocklist.is_empty() {
            let quoted: Vec<String> = self
                .blocklist
                .phrases()
                .iter()
                .map(|p| format!("„{p}“"))
                .collect();
            let _ = write!(out, "\n- Vermeide: {}.", quoted.join(", "));
        }
        out
    }

    pub fn render_examples(&self) -> String {
        self.examples
            .iter()
            .enumerate()
            .map(|(i, ex)| format!("Beispiel {}:\n{}", i + 1, ex.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
