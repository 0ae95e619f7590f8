use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http_client::build_completion_client;
use super::scrub::api_error;
use super::traits::{CompletionClient, CompletionRequest};
use crate::error::CompletionError;

const PROVIDER: &str = "ollama";

/// Client for a local Ollama server (`POST /api/chat`, non-streaming).
pub struct OllamaClient {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
    top_p: f64,
    repeat_penalty: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            timeout_secs,
            client: build_completion_client(timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(request: &CompletionRequest) -> ChatRequest<'_> {
        let mut messages = Vec::with_capacity(2);

        if let Some(sys) = request.system.as_deref() {
            messages.push(Message {
                role: "system",
                content: sys,
            });
        }

        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            stream: false,
            options: Options {
                temperature: request.sampling.temperature,
                top_p: request.sampling.top_p,
                repeat_penalty: request.sampling.repeat_penalty,
                num_predict: request.sampling.num_predict,
            },
        }
    }
}

fn request_error(err: &reqwest::Error, timeout_secs: u64) -> CompletionError {
    if err.is_timeout() {
        return CompletionError::Timeout {
            provider: PROVIDER.to_string(),
            after_secs: timeout_secs,
        };
    }
    CompletionError::Request {
        provider: PROVIDER.to_string(),
        message: format!("{err}. Is Ollama running? (ollama serve)"),
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = Self::build_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(&e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }

        let chat: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    message: e.to_string(),
                })?;

        let text = chat
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse {
                provider: PROVIDER.to_string(),
            });
        }

        tracing::debug!(
            model = %request.model,
            chars = text.len(),
            eval_count = chat.eval_count.unwrap_or_default(),
            "ollama completion finished"
        );
        Ok(text)
    }
}
