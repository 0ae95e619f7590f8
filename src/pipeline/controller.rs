use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tracing::{info, warn};

use super::stages::{StageContext, draft, style_edit};
use super::types::{CandidateText, CandidateVersion, GenerationRequest};
use crate::completion::{CompletionClient, SamplingOptions};
use crate::config::Config;
use crate::error::{PipelineError, PromptError};
use crate::metrics::{self, MetricReport};
use crate::policy::{self, AcceptanceVerdict, Thresholds};
use crate::prompt::{EditInstruction, PromptBuilder};
use crate::style::StyleGuide;

/// Controller states, recorded in [`PipelineRun::trace`] as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControllerState {
    Drafting,
    Styling,
    Evaluating,
    Retrying,
    Accepted,
    Exhausted,
}

/// Decision taken after each evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Accept,
    Retry,
    Exhaust,
}

/// Pure transition out of `Evaluating`.
pub fn next_step(verdict: &AcceptanceVerdict, attempts: u32, max_attempts: u32) -> Step {
    if verdict.passed {
        Step::Accept
    } else if attempts < max_attempts {
        Step::Retry
    } else {
        Step::Exhaust
    }
}

/// Retry budget, per-call timeout and sampling per stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewriteSettings {
    pub max_attempts: u32,
    pub call_timeout: Duration,
    pub draft_sampling: SamplingOptions,
    pub edit_sampling: SamplingOptions,
    pub repair_sampling: SamplingOptions,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        let base = SamplingOptions::default();
        Self {
            max_attempts: 3,
            call_timeout: Duration::from_secs(180),
            draft_sampling: base.with_temperature(0.8),
            edit_sampling: base.with_temperature(0.6),
            repair_sampling: base.with_temperature(0.5),
        }
    }
}

impl RewriteSettings {
    pub fn from_config(config: &Config) -> Self {
        let completion = &config.completion;
        let base = SamplingOptions {
            temperature: completion.draft_temperature,
            top_p: completion.top_p,
            repeat_penalty: completion.repeat_penalty,
            num_predict: completion.num_predict,
        };
        Self {
            max_attempts: config.rewrite.max_attempts,
            call_timeout: Duration::from_secs(completion.timeout_secs),
            draft_sampling: base,
            edit_sampling: base.with_temperature(completion.edit_temperature),
            repair_sampling: base.with_temperature(completion.repair_temperature),
        }
    }
}

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// Pre-edit draft, kept for `--show-draft`.
    pub draft: CandidateText,
    /// Accepted candidate, or the last one produced when exhausted.
    pub candidate: CandidateText,
    pub report: MetricReport,
    pub verdict: AcceptanceVerdict,
    /// Corrective rewrites issued.
    pub attempts: u32,
    pub completion_calls: u32,
    pub trace: Vec<ControllerState>,
}

/// Result of a run that did not hit a transport failure.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Accepted(PipelineRun),
    /// Retry budget spent. The text is still usable; the caller decides.
    Exhausted(PipelineRun),
}

impl PipelineOutcome {
    pub fn run(&self) -> &PipelineRun {
        match self {
            Self::Accepted(run) | Self::Exhausted(run) => run,
        }
    }

    pub fn into_run(self) -> PipelineRun {
        match self {
            Self::Accepted(run) | Self::Exhausted(run) => run,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Orchestrates Draft → Style-Edit → Evaluate and the corrective loop.
///
/// Holds only immutable configuration, so one controller can serve several
/// concurrent runs; each run owns its candidate chain.
pub struct RewriteController {
    client: Arc<dyn CompletionClient>,
    style: Arc<StyleGuide>,
    thresholds: Thresholds,
    settings: RewriteSettings,
    prompts: PromptBuilder,
}

impl RewriteController {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        style: Arc<StyleGuide>,
        thresholds: Thresholds,
        settings: RewriteSettings,
    ) -> Result<Self, PromptError> {
        let prompts = PromptBuilder::new(Arc::clone(&style), &thresholds)?;
        Ok(Self {
            client,
            style,
            thresholds,
            settings,
            prompts,
        })
    }

    fn judge(
        &self,
        candidate: &CandidateText,
        keyword: Option<&str>,
    ) -> (MetricReport, AcceptanceVerdict) {
        let report =
            metrics::evaluate_with_keyword(candidate.text(), &self.style.blocklist, keyword);
        let verdict = policy::evaluate(&report, &self.thresholds);
        (report, verdict)
    }

    pub async fn run(&self, request: &GenerationRequest) -> Result<PipelineOutcome, PipelineError> {
        let ctx = StageContext {
            client: self.client.as_ref(),
            prompts: &self.prompts,
            timeout: self.settings.call_timeout,
        };
        let mut trace = vec![ControllerState::Drafting];
        info!(topic = request.topic(), model = request.model(), "drafting");
        let draft_text = draft(ctx, request, self.settings.draft_sampling).await?;

        trace.push(ControllerState::Styling);
        let mut candidate = style_edit(
            ctx,
            request.model(),
            &draft_text,
            EditInstruction::Initial,
            CandidateVersion::Styled,
            self.settings.edit_sampling,
        )
        .await?;
        let mut completion_calls = 2;
        let mut attempts = 0;

        loop {
            trace.push(ControllerState::Evaluating);
            let (report, verdict) = self.judge(&candidate, request.keyword());
            info!(
                version = %candidate.version(),
                passed = verdict.passed,
                violations = verdict.violations.len(),
                "candidate evaluated"
            );

            match next_step(&verdict, attempts, self.settings.max_attempts) {
                Step::Accept => {
                    trace.push(ControllerState::Accepted);
                    return Ok(PipelineOutcome::Accepted(PipelineRun {
                        draft: draft_text,
                        candidate,
                        report,
                        verdict,
                        attempts,
                        completion_calls,
                        trace,
                    }));
                }
                Step::Exhaust => {
                    trace.push(ControllerState::Exhausted);
                    warn!(
                        attempts,
                        violations = verdict.violations.len(),
                        "rewrite budget exhausted, returning last candidate"
                    );
                    return Ok(PipelineOutcome::Exhausted(PipelineRun {
                        draft: draft_text,
                        candidate,
                        report,
                        verdict,
                        attempts,
                        completion_calls,
                        trace,
                    }));
                }
                Step::Retry => {
                    trace.push(ControllerState::Retrying);
                    attempts += 1;
                    for violation in &verdict.violations {
                        info!(attempt = attempts, "violation {}", violation.describe());
                    }
                    candidate = style_edit(
                        ctx,
                        request.model(),
                        &candidate,
                        EditInstruction::Corrective {
                            verdict: &verdict,
                            report: &report,
                            keyword: request.keyword(),
                        },
                        CandidateVersion::Rewrite(attempts),
                        self.settings.repair_sampling,
                    )
                    .await?;
                    completion_calls += 1;
                }
            }
        }
    }
}
