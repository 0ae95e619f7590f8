use serde::Serialize;
use std::fmt;
use strum::Display;

/// Which completion-backed stage was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Draft,
    StyleEdit,
    Rewrite,
}

/// Inputs of one pipeline run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: String,
    details: String,
    model: String,
    keyword: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        topic: impl Into<String>,
        details: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            details: details.into(),
            model: model.into(),
            keyword: None,
        }
    }

    /// Focus keyword for the H1 and opening. Blank keywords are ignored.
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = (!keyword.trim().is_empty()).then_some(keyword);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }
}

/// Position of a candidate in the draft → styled → rewrite chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateVersion {
    Draft,
    Styled,
    Rewrite(u32),
}

impl fmt::Display for CandidateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Styled => f.write_str("styled"),
            Self::Rewrite(n) => write!(f, "rewrite-{n}"),
        }
    }
}

/// One produced text. Never modified; a rewrite yields a new candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateText {
    version: CandidateVersion,
    text: String,
}

impl CandidateText {
    pub fn new(version: CandidateVersion, text: impl Into<String>) -> Self {
        Self {
            version,
            text: text.into(),
        }
    }

    pub fn version(&self) -> CandidateVersion {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
