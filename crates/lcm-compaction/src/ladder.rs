//! The three-level escalation ladder (§4.C): `preserve_details` then
//! `bullet_points` (both LLM calls), then the deterministic `truncated`
//! fallback that never fails.

use lcm_core::{tokens, SummaryKind};
use lcm_llm::LlmClient;

/// One produced summary: its fidelity level, text, and token estimate.
#[derive(Debug, Clone)]
pub struct LadderResult {
    pub kind: SummaryKind,
    pub content: String,
    pub token_estimate: u32,
}

/// Returned when every LLM level failed and the caller asked not to
/// force the deterministic fallback (soft compaction, §4.D: "the pass
/// aborts cleanly, no state changes, and is retried on the next soft
/// trigger").
#[derive(Debug)]
pub struct LadderAborted;

/// Try `preserve_details` then `bullet_points`; if both LLM calls fail,
/// abort rather than degrade to `truncated`. Used by soft compaction.
pub async fn escalate_or_abort(
    llm: &dyn LlmClient,
    block_text: &str,
    target_tokens: u32,
    overshoot_factor: f64,
) -> Result<LadderResult, LadderAborted> {
    if let Some(r) = try_llm_level(llm, block_text, SummaryKind::PreserveDetails, target_tokens, overshoot_factor)
        .await
    {
        return Ok(r);
    }
    if let Some(r) = try_llm_level(llm, block_text, SummaryKind::BulletPoints, target_tokens, overshoot_factor)
        .await
    {
        return Ok(r);
    }
    Err(LadderAborted)
}

/// Try `preserve_details` then `bullet_points`; if both fail, force the
/// deterministic `truncated` level, which cannot fail (§4.D hard
/// compaction "forces the `truncated` escalation level").
pub async fn escalate_or_force_truncated(
    llm: &dyn LlmClient,
    block_text: &str,
    target_tokens: u32,
    overshoot_factor: f64,
) -> LadderResult {
    match escalate_or_abort(llm, block_text, target_tokens, overshoot_factor).await {
        Ok(r) => r,
        Err(LadderAborted) => truncated_only(block_text, target_tokens),
    }
}

async fn try_llm_level(
    llm: &dyn LlmClient,
    block_text: &str,
    kind: SummaryKind,
    target_tokens: u32,
    overshoot_factor: f64,
) -> Option<LadderResult> {
    let text = llm.summarize(block_text, kind, target_tokens).await.ok()?;
    let token_estimate = tokens::estimate(&text);
    let ceiling = (target_tokens as f64 * overshoot_factor).floor() as u32;
    if token_estimate <= ceiling {
        Some(LadderResult {
            kind,
            content: text,
            token_estimate,
        })
    } else {
        None
    }
}

/// The deterministic, non-LLM terminal fallback: keep the first
/// `floor(T/2)` and last `floor(T/2)` tokens (approximated via
/// characters) of `block_text`, joined by an explicit elision marker.
/// Always produces a result with `token_estimate <= target_tokens`.
pub fn truncated_only(block_text: &str, target_tokens: u32) -> LadderResult {
    if tokens::estimate(block_text) <= target_tokens {
        return LadderResult {
            kind: SummaryKind::Truncated,
            token_estimate: tokens::estimate(block_text),
            content: block_text.to_string(),
        };
    }

    // Reserve headroom for the marker text itself so the final estimate
    // never exceeds target_tokens even after its own token cost.
    const MARKER_RESERVE_TOKENS: u32 = 12;
    let budget = target_tokens.saturating_sub(MARKER_RESERVE_TOKENS).max(2);
    let half_tokens = budget / 2;
    let half_chars = (half_tokens as usize) * 4;

    let chars: Vec<char> = block_text.chars().collect();
    let half_chars = half_chars.min(chars.len() / 2);
    let head: String = chars[..half_chars].iter().collect();
    let tail: String = chars[chars.len() - half_chars..].iter().collect();
    let elided_chars = chars.len().saturating_sub(2 * half_chars);
    let elided_tokens = (elided_chars as u32).div_ceil(4);

    let content = format!("{head}\u{2026} [{elided_tokens} tokens elided] \u{2026}{tail}");
    let token_estimate = tokens::estimate(&content);
    LadderResult {
        kind: SummaryKind::Truncated,
        content,
        token_estimate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcm_llm::StubLlmClient;

    #[tokio::test]
    async fn preserve_details_wins_when_it_fits() {
        let llm = StubLlmClient::new();
        let result = escalate_or_force_truncated(&llm, "short block", 100, 1.25).await;
        assert_eq!(result.kind, SummaryKind::PreserveDetails);
    }

    #[tokio::test]
    async fn falls_back_to_truncated_when_llm_unavailable() {
        let llm = StubLlmClient::always_failing();
        let result = escalate_or_force_truncated(&llm, &"word ".repeat(5000), 50, 1.25).await;
        assert_eq!(result.kind, SummaryKind::Truncated);
        assert!(result.token_estimate <= 50);
    }

    #[tokio::test]
    async fn soft_mode_aborts_instead_of_truncating() {
        let llm = StubLlmClient::always_failing();
        let result = escalate_or_abort(&llm, "some text", 50, 1.25).await;
        assert!(result.is_err());
    }

    #[test]
    fn truncated_never_exceeds_target() {
        let text = "lorem ipsum ".repeat(10_000);
        let result = truncated_only(&text, 200);
        assert!(result.token_estimate <= 200);
        assert!(result.content.contains("tokens elided"));
    }

    #[test]
    fn truncated_passes_short_text_through() {
        let result = truncated_only("tiny", 1000);
        assert_eq!(result.content, "tiny");
    }
}
