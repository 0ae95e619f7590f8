use std::time::Duration;
use tracing::{debug, info};

use super::types::{CandidateText, CandidateVersion, GenerationRequest, Stage};
use crate::completion::{CompletionClient, CompletionRequest, SamplingOptions};
use crate::error::{CompletionError, PipelineError};
use crate::prompt::{EditInstruction, PromptBuilder};

/// What every stage needs to issue its single completion call.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub client: &'a dyn CompletionClient,
    pub prompts: &'a PromptBuilder,
    pub timeout: Duration,
}

impl StageContext<'_> {
    /// One bounded completion call. Timeouts, transport errors and blank
    /// replies all become a terminal [`PipelineError::Transport`].
    async fn call(&self, stage: Stage, request: CompletionRequest) -> Result<String, PipelineError> {
        debug!(
            %stage,
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "sending completion request"
        );

        let outcome = tokio::time::timeout(self.timeout, self.client.complete(&request)).await;
        let text = match outcome {
            Err(_) => {
                return Err(PipelineError::transport(
                    stage,
                    CompletionError::Timeout {
                        provider: self.client.name().to_string(),
                        after_secs: self.timeout.as_secs(),
                    },
                ));
            }
            Ok(result) => result.map_err(|e| PipelineError::transport(stage, e))?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::transport(
                stage,
                CompletionError::EmptyResponse {
                    provider: self.client.name().to_string(),
                },
            ));
        }
        Ok(text.to_string())
    }
}

/// Draft Stage: topic, details and the full style guide in, raw article out.
pub async fn draft(
    ctx: StageContext<'_>,
    request: &GenerationRequest,
    sampling: SamplingOptions,
) -> Result<CandidateText, PipelineError> {
    let prompt = ctx.prompts.draft(request.topic(), request.details(), request.keyword())?;
    let completion = CompletionRequest::new(request.model(), prompt)
        .with_system(ctx.prompts.system())
        .with_sampling(sampling);

    let text = ctx.call(Stage::Draft, completion).await?;
    info!(words = text.split_whitespace().count(), "draft ready");
    Ok(CandidateText::new(CandidateVersion::Draft, text))
}

/// Style-Edit Stage: revise `previous` into `next`, either with the standard
/// editing rules or with a corrective instruction. Never passes the input
/// through on failure.
pub async fn style_edit(
    ctx: StageContext<'_>,
    model: &str,
    previous: &CandidateText,
    instruction: EditInstruction<'_>,
    next: CandidateVersion,
    sampling: SamplingOptions,
) -> Result<CandidateText, PipelineError> {
    let stage = match instruction {
        EditInstruction::Initial => Stage::StyleEdit,
        EditInstruction::Corrective { .. } => Stage::Rewrite,
    };
    let prompt = ctx.prompts.edit(previous.text(), instruction)?;
    let completion = CompletionRequest::new(model, prompt)
        .with_system(ctx.prompts.system())
        .with_sampling(sampling);

    let text = ctx.call(stage, completion).await?;
    info!(from = %previous.version(), to = %next, "candidate revised");
    Ok(CandidateText::new(next, text))
}
