//! Anthropic Messages API client: `x-api-key`/`anthropic-version`
//! headers, one request/response round trip per call, no streaming —
//! every call here produces one summarization/classification result and
//! returns its text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use lcm_core::SummaryKind;

use crate::error::{LlmError, Result};
use crate::retry::RetryPolicy;
use crate::traits::{LlmClient, ToolSpec};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const PRESERVE_DETAILS_PROMPT: &str = "You compress a span of an agent's conversation \
transcript while preserving every concrete detail: tool names, file paths, identifiers, \
command output, and decisions, verbatim where possible. Compress prose; never drop a fact. \
Emit bulleted but long-form output.";

const BULLET_POINTS_PROMPT: &str = "You compress a span of an agent's conversation transcript \
into short bullet points covering only the high-level actions taken and their outcomes. \
Drop intermediate detail; keep the narrative arc.";

pub struct AnthropicLlmClient {
    client: Client,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl AnthropicLlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        self.retry
            .run(|| async { self.call_once(system, user, max_tokens).await })
            .await
    }

    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn call_once(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
            max_tokens,
        };

        debug!("sending request to Anthropic API");
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Anthropic API error");
            return Err(LlmError::Unavailable(format!("{status}: {body}")));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    async fn summarize(&self, block: &str, kind: SummaryKind, max_tokens: u32) -> Result<String> {
        let system = match kind {
            SummaryKind::PreserveDetails => PRESERVE_DETAILS_PROMPT,
            SummaryKind::BulletPoints => BULLET_POINTS_PROMPT,
            SummaryKind::Truncated => {
                return Err(LlmError::Input(
                    "truncated summaries are produced deterministically, not via the LLM"
                        .to_string(),
                ))
            }
        };
        self.call(system, block, max_tokens).await
    }

    async fn classify(&self, text: &str, labels: &[String]) -> Result<String> {
        if labels.is_empty() {
            return Err(LlmError::Input("classify requires at least one label".to_string()));
        }
        let system = format!(
            "Classify the given text into exactly one of these labels: {}. \
             Respond with only the label text, nothing else.",
            labels.join(", ")
        );
        let raw = self.call(&system, text, 16).await?;
        let chosen = raw.trim();
        labels
            .iter()
            .find(|l| l.as_str() == chosen)
            .cloned()
            .ok_or_else(|| {
                LlmError::Unavailable(format!("model returned an unrecognized label: {chosen}"))
            })
    }

    async fn agent_loop(
        &self,
        system: &str,
        _tools: &[ToolSpec],
        initial: &str,
        max_turns: u32,
    ) -> Result<String> {
        let mut transcript = initial.to_string();
        let mut last = String::new();
        for _ in 0..max_turns.max(1) {
            last = self.call(system, &transcript, 4096).await?;
            transcript.push_str("\n\n");
            transcript.push_str(&last);
            if !last.trim_end().ends_with("CONTINUE") {
                break;
            }
        }
        Ok(last)
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    system: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}
