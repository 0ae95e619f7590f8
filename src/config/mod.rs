pub mod schema;

pub use schema::{CompletionConfig, Config, MAX_REWRITE_ATTEMPTS, RewriteConfig, StyleConfig};
