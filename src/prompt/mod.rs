mod builder;
mod engine;

pub use builder::{EditInstruction, PromptBuilder, RepairFocus};
pub use engine::TeraEngine;
