//! Draft → Style-Edit → Evaluate, with a bounded corrective rewrite loop.

mod controller;
mod stages;
mod types;

pub use controller::{
    ControllerState, PipelineOutcome, PipelineRun, RewriteController, RewriteSettings, Step,
    next_step,
};
pub use stages::{StageContext, draft, style_edit};
pub use types::{CandidateText, CandidateVersion, GenerationRequest, Stage};
