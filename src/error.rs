use thiserror::Error;

use crate::pipeline::Stage;

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Completion (transport) errors ───────────────────────────────────────────

/// Failure of a single completion call.
///
/// Every variant is terminal for a pipeline run: the rewrite loop only
/// recovers from text-quality problems, never from a broken transport.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} did not answer within {after_secs}s")]
    Timeout { provider: String, after_secs: u64 },

    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("{provider} returned empty text")]
    EmptyResponse { provider: String },
}

impl CompletionError {
    /// True when the service could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::Timeout { .. })
    }
}

// ─── Prompt / Template errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template render failed: {0}")]
    Render(String),

    #[error("template not found: {0}")]
    NotFound(String),
}

// ─── Pipeline errors ────────────────────────────────────────────────────────

/// Terminal pipeline failure. Exhausting the retry budget is not an error and
/// never shows up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: CompletionError,
    },

    #[error("prompt: {0}")]
    Prompt(#[from] PromptError),
}

impl PipelineError {
    pub fn transport(stage: Stage, source: CompletionError) -> Self {
        Self::Transport { stage, source }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_stage_and_provider() {
        let err = PipelineError::transport(
            Stage::Draft,
            CompletionError::Timeout {
                provider: "ollama".into(),
                after_secs: 30,
            },
        );
        let text = err.to_string();
        assert!(text.contains("draft"));
        assert!(text.contains("ollama"));
        assert!(text.contains("30s"));
        assert!(err.is_transport());
    }

    #[test]
    fn unreachable_covers_request_and_timeout_only() {
        let request = CompletionError::Request {
            provider: "ollama".into(),
            message: "connection refused".into(),
        };
        let empty = CompletionError::EmptyResponse {
            provider: "ollama".into(),
        };
        assert!(request.is_unreachable());
        assert!(!empty.is_unreachable());
    }

    #[test]
    fn prompt_error_is_not_transport() {
        let err = PipelineError::from(PromptError::Render("missing var".into()));
        assert!(!err.is_transport());
        assert!(err.to_string().contains("missing var"));
    }
}
