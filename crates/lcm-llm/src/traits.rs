//! The abstract LLM client contract (§4.B): three idempotent calls used
//! by the escalation ladder (`summarize`), the file-type-aware analyzer
//! (`classify`), and the `agentic_map` operator (`agent_loop`, outside
//! the compaction hot path).

use async_trait::async_trait;

use lcm_core::SummaryKind;

use crate::error::Result;

/// A tool made available to [`LlmClient::agent_loop`]. Execution is the
/// host's responsibility (§1 Out of scope); this is just the
/// declaration sent to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Summarize `block` (the concatenated content of one contiguous
    /// message/summary run) at the prompt template selected by `kind`,
    /// targeting `max_tokens`. Only `PreserveDetails` and `BulletPoints`
    /// are ever passed here — `Truncated` is produced deterministically
    /// by the ladder itself (§4.C) and never reaches the LLM.
    async fn summarize(&self, block: &str, kind: SummaryKind, max_tokens: u32) -> Result<String>;

    /// Classify `text` into exactly one of `labels`.
    async fn classify(&self, text: &str, labels: &[String]) -> Result<String>;

    /// Run a bounded tool-calling loop and return the final assistant
    /// text. Used only by `agentic_map`; not exercised by compaction.
    async fn agent_loop(
        &self,
        system: &str,
        tools: &[ToolSpec],
        initial: &str,
        max_turns: u32,
    ) -> Result<String>;
}
