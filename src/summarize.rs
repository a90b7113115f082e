use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::SummarizerConfig;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Summarizer returned no content")]
    EmptyResponse,

    #[error("Summarizer API key not found in configuration or environment")]
    MissingApiKey,
}

/// Turns an assembled JSON document into markdown.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, document: &str) -> Result<String, SummarizeError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatSummarizer {
    client: reqwest::Client,
    config: SummarizerConfig,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(SummarizeError::MissingApiKey)?;
        Ok(Self {
            client: reqwest::Client::new(),
            config: config.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    #[instrument(skip(self, document), fields(model = %self.config.model, document_bytes = document.len()))]
    async fn summarize(&self, document: &str) -> Result<String, SummarizeError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: document,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let summary = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)?;
        debug!(summary_bytes = summary.len(), "received summary");
        Ok(summary)
    }
}
