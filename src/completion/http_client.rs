use reqwest::Client;
use std::time::Duration;

/// Build the shared HTTP client for completion calls.
///
/// Local models can take minutes for a long article, so the overall timeout
/// is configurable while connecting stays short.
pub fn build_completion_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}
