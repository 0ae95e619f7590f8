//! Completion Client boundary.
//!
//! The pipeline only needs "prompt in, text or error out". Everything that
//! knows about a wire protocol lives behind [`CompletionClient`].

pub mod http_client;
pub mod ollama;
pub mod scrub;
pub mod traits;

pub use ollama::OllamaClient;
pub use scrub::{api_error, sanitize_api_error};
pub use traits::{CompletionClient, CompletionRequest, SamplingOptions};
