//! Article layout signals: frontmatter, headings, numbered steps, the
//! opening window and SEO field lengths.
//!
//! Headings match at the start of a line only (`# `, `## `, `### `). Section
//! names compare with all whitespace removed, so `Hintergrund&Tipps` and
//! `Hintergrund & Tipps` are the same heading.

use serde::{Deserialize, Serialize};

use super::tokenize;

/// Words of the opening inspected for voice and keyword.
pub const OPENING_WINDOW: usize = 100;

/// Headings a recipe article must carry, in reading order.
pub const REQUIRED_SECTIONS: [(&str, &str); 6] = [
    ("##", "Einleitung"),
    ("##", "Hintergrund & Tipps"),
    ("##", "Rezept:"),
    ("###", "Zutaten"),
    ("###", "Schritt für Schritt"),
    ("###", "Zeiten & Portionen"),
];

const FIRST_PERSON_SINGULAR: [&str; 9] = [
    "ich", "mich", "mir", "mein", "meine", "meinem", "meinen", "meiner", "meines",
];

/// Layout of one candidate. Keyword fields are `None` without a keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    pub has_frontmatter: bool,
    pub has_title: bool,
    /// Required headings not found, as `## Name`.
    pub missing_sections: Vec<String>,
    pub numbered_steps: usize,
    pub first_person_in_opening: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_in_title: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_in_opening: Option<bool>,
    /// Characters of `seo_title`, 0 when absent.
    pub seo_title_chars: usize,
    /// Characters of `meta_description`, 0 when absent.
    pub meta_description_chars: usize,
}

/// Split a leading `---` block off the text.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else {
        return (None, text);
    };
    let Some(open_end) = rest.find('\n') else {
        return (None, text);
    };
    if !rest[..open_end].trim().is_empty() {
        return (None, text);
    }
    let inner = &rest[open_end + 1..];

    let mut offset = 0;
    for line in inner.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&inner[..offset]), &inner[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

fn heading<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn is_numbered_step(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let mut rest = line[digits..].chars();
    rest.next() == Some('.') && rest.next().is_none_or(char::is_whitespace)
}

/// Value of `key: "value"` (quotes optional) in a frontmatter block.
fn field<'a>(frontmatter: &'a str, key: &str) -> Option<&'a str> {
    frontmatter.lines().find_map(|line| {
        let value = line.trim().strip_prefix(key)?.strip_prefix(':')?;
        Some(value.trim().trim_matches('"'))
    })
}

pub fn analyze(text: &str, keyword: Option<&str>) -> StructureReport {
    let (frontmatter, body) = split_frontmatter(text);
    let lines: Vec<&str> = body.lines().collect();

    let title = lines.iter().find_map(|l| heading(l, "#"));
    let missing_sections = REQUIRED_SECTIONS
        .iter()
        .filter(|(marker, name)| {
            let wanted = squash(name);
            !lines
                .iter()
                .filter_map(|l| heading(l, marker))
                .any(|h| squash(h).starts_with(&wanted))
        })
        .map(|(marker, name)| format!("{marker} {name}"))
        .collect();

    let opening: Vec<String> = tokenize(body)
        .into_iter()
        .take(OPENING_WINDOW)
        .map(str::to_lowercase)
        .collect();
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty()).map(str::to_lowercase);

    StructureReport {
        has_frontmatter: frontmatter.is_some(),
        has_title: title.is_some_and(|t| !t.is_empty()),
        missing_sections,
        numbered_steps: lines.iter().filter(|l| is_numbered_step(l)).count(),
        first_person_in_opening: opening
            .iter()
            .any(|t| FIRST_PERSON_SINGULAR.contains(&t.as_str())),
        keyword_in_title: keyword
            .as_deref()
            .map(|k| title.is_some_and(|t| t.to_lowercase().contains(k))),
        // Compared token-wise, so "One-Pot-Pasta" matches "one pot pasta".
        keyword_in_opening: keyword
            .as_deref()
            .map(|k| opening.join(" ").contains(&tokenize(k).join(" "))),
        seo_title_chars: frontmatter
            .and_then(|f| field(f, "seo_title"))
            .map_or(0, |v| v.chars().count()),
        meta_description_chars: frontmatter
            .and_then(|f| field(f, "meta_description"))
            .map_or(0, |v| v.chars().count()),
    }
}
