//! A deterministic in-memory [`LlmClient`], for tests that exercise the
//! escalation ladder and compaction engine without a network call. Can
//! be configured to fail a fixed number of times before succeeding, so
//! callers can exercise retry and `LLMUnavailable` escalation paths.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use lcm_core::SummaryKind;

use crate::error::{LlmError, Result};
use crate::traits::{LlmClient, ToolSpec};

pub struct StubLlmClient {
    fail_first_n: AtomicU32,
    calls: AtomicU32,
    canned_classification: Mutex<Option<String>>,
}

impl StubLlmClient {
    pub fn new() -> Self {
        Self {
            fail_first_n: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            canned_classification: Mutex::new(None),
        }
    }

    /// Fail the first `n` calls with `LLMUnavailable`, then start
    /// succeeding. Used to test soft-compaction abort / hard-compaction
    /// fallback to `Truncated` (§4.D failure semantics).
    pub fn failing(n: u32) -> Self {
        let s = Self::new();
        s.fail_first_n.store(n, Ordering::SeqCst);
        s
    }

    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first_n.load(Ordering::SeqCst) {
            return Err(LlmError::Unavailable("stub forced failure".to_string()));
        }
        Ok(())
    }
}

impl Default for StubLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for StubLlmClient {
    async fn summarize(&self, block: &str, kind: SummaryKind, max_tokens: u32) -> Result<String> {
        self.maybe_fail()?;
        let prefix = match kind {
            SummaryKind::PreserveDetails => "[preserve_details]",
            SummaryKind::BulletPoints => "[bullet_points]",
            SummaryKind::Truncated => {
                return Err(LlmError::Input(
                    "truncated summaries never reach the LLM".to_string(),
                ))
            }
        };
        let budget_chars = (max_tokens as usize) * 4;
        let body: String = block.chars().take(budget_chars).collect();
        Ok(format!("{prefix} {body}"))
    }

    async fn classify(&self, _text: &str, labels: &[String]) -> Result<String> {
        self.maybe_fail()?;
        if let Some(canned) = self.canned_classification.lock().unwrap().clone() {
            return Ok(canned);
        }
        labels
            .first()
            .cloned()
            .ok_or_else(|| LlmError::Input("classify requires at least one label".to_string()))
    }

    async fn agent_loop(
        &self,
        _system: &str,
        _tools: &[ToolSpec],
        initial: &str,
        _max_turns: u32,
    ) -> Result<String> {
        self.maybe_fail()?;
        Ok(format!("done: {initial}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn summarize_respects_token_budget() {
        let stub = StubLlmClient::new();
        let out = stub
            .summarize(&"x".repeat(1000), SummaryKind::BulletPoints, 10)
            .await
            .unwrap();
        assert!(lcm_core::tokens::estimate(&out) <= 10 + 2);
    }

    #[tokio::test]
    async fn fails_first_n_then_succeeds() {
        let stub = StubLlmClient::failing(2);
        assert!(stub
            .summarize("hi", SummaryKind::PreserveDetails, 100)
            .await
            .is_err());
        assert!(stub
            .summarize("hi", SummaryKind::PreserveDetails, 100)
            .await
            .is_err());
        assert!(stub
            .summarize("hi", SummaryKind::PreserveDetails, 100)
            .await
            .is_ok());
    }
}
