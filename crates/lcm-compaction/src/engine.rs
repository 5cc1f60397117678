//! The compaction engine (§4.D): the soft/hard threshold control loop
//! and DAG condensation, guarded by a per-session advisory lock so at
//! most one pass runs per session at a time (§5 concurrency discipline).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use lcm_core::{Child, Config, Message};
use lcm_llm::LlmClient;
use lcm_store::Store;

use crate::ladder::{self, LadderAborted};

pub type Result<T> = std::result::Result<T, lcm_store::StoreError>;

/// Drives compaction for every session sharing one `Store`/`LlmClient`
/// pair. Cheap to clone (it's a handle); the advisory locks live behind
/// an `Arc` so cloned handles still serialize on the same session.
pub struct CompactionEngine {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
    config: Config,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CompactionEngine {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            llm,
            config,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    fn lock_for(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Observe token pressure and react (§4.D): hard pressure blocks the
    /// caller synchronously, soft pressure is offloaded to a detached
    /// task so the caller (a capture hook) is never blocked by it (§9
    /// "do not rely on the host's hook-async flag for correctness").
    pub async fn on_capture(self: &Arc<Self>, session_id: &str) -> Result<()> {
        let totals = self.store.session_totals(session_id)?;
        let tokens = totals.tokens();
        if tokens >= self.config.compaction.tau_hard_tokens as i64 {
            self.hard_compact(session_id).await?;
        } else if tokens >= self.config.compaction.tau_soft_tokens as i64 {
            self.spawn_soft(session_id.to_string());
        }
        Ok(())
    }

    fn spawn_soft(self: &Arc<Self>, session_id: String) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.soft_compact(&session_id).await {
                warn!(session_id, error = %e, "soft compaction pass failed");
            }
        });
    }

    /// One soft-pressure pass: at most one block, LLM-unavailable aborts
    /// cleanly (§4.D). Condensation is checked afterward regardless.
    pub async fn soft_compact(&self, session_id: &str) -> Result<()> {
        let lock = self.lock_for(session_id);
        let _guard = match lock.try_lock() {
            Ok(g) => g,
            Err(_) => return Ok(()), // a pass is already running; the next trigger will retry
        };

        if let Some(block) = self.select_block(session_id, false)? {
            match self.summarize_leaf_block(session_id, &block, false).await {
                Ok(_) => {}
                Err(LadderAborted) => {
                    info!(session_id, "soft compaction aborted: LLM unavailable");
                    return Ok(());
                }
            }
        }
        self.condense_cascade(session_id).await?;
        Ok(())
    }

    /// Synchronous hard-pressure drain: blocks until
    /// `session_totals.tokens() <= tau_soft`, forcing `truncated` if the
    /// LLM is unavailable so the pass always terminates (§4.D).
    pub async fn hard_compact(&self, session_id: &str) -> Result<()> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        loop {
            let totals = self.store.session_totals(session_id)?;
            if totals.tokens() <= self.config.compaction.tau_soft_tokens as i64 {
                break;
            }
            match self.select_block(session_id, true)? {
                Some(block) => {
                    let _ = self.summarize_leaf_block(session_id, &block, true).await;
                }
                None => break, // nothing left to summarize
            }
        }
        self.condense_cascade(session_id).await?;
        Ok(())
    }

    /// The oldest contiguous run of unsummarized messages whose
    /// cumulative token estimate lands in `[block_min, block_max]`. Under
    /// hard pressure (`allow_undersized`), falls back to whatever
    /// messages remain, down to a floor of one (§4.D).
    fn select_block(&self, session_id: &str, allow_undersized: bool) -> Result<Option<Vec<Message>>> {
        let msgs = self.store.unsummarized_messages(session_id)?;
        if msgs.is_empty() {
            return Ok(None);
        }

        let mut block = Vec::new();
        let mut cumulative = 0u32;
        for m in msgs {
            cumulative += m.token_estimate;
            block.push(m);
            if cumulative >= self.config.compaction.block_min_tokens {
                if cumulative > self.config.compaction.block_max_tokens && block.len() > 1 {
                    let without_last = cumulative - block.last().unwrap().token_estimate;
                    // Only shed the message that pushed us over block_max
                    // if doing so still clears block_min; otherwise a
                    // single outsized message jumped the whole block from
                    // under the floor to over the ceiling in one step, and
                    // popping it would return an undersized block instead.
                    if without_last >= self.config.compaction.block_min_tokens {
                        block.pop();
                    }
                }
                return Ok(Some(block));
            }
        }

        if allow_undersized && !block.is_empty() {
            return Ok(Some(block));
        }
        Ok(None)
    }

    async fn summarize_leaf_block(
        &self,
        session_id: &str,
        block: &[Message],
        force_truncated: bool,
    ) -> std::result::Result<(), LadderAborted> {
        let text = render_block(block);
        let target = self.config.compaction.leaf_target_tokens();
        let result = if force_truncated {
            ladder::escalate_or_force_truncated(
                self.llm.as_ref(),
                &text,
                target,
                self.config.compaction.overshoot_factor,
            )
            .await
        } else {
            ladder::escalate_or_abort(
                self.llm.as_ref(),
                &text,
                target,
                self.config.compaction.overshoot_factor,
            )
            .await?
        };

        let children: Vec<Child> = block.iter().map(|m| Child::Message(m.id)).collect();
        self.store
            .insert_summary(
                session_id,
                0,
                result.kind,
                &result.content,
                result.token_estimate,
                &children,
            )
            .map_err(|_| LadderAborted)?;
        Ok(())
    }

    /// Condense uncondensed summaries into the next level whenever any
    /// level reaches the fan-out `C` (§4.D). Cascades: creating a
    /// level-(k+1) summary may itself trigger condensation at k+1.
    /// Bounded because each level strictly reduces node count. Treated
    /// like hard compaction for LLM failures (forces `truncated`) since
    /// condensation must always make progress to keep the cascade
    /// bounded, a judgment call left unstated by the invariants (DESIGN.md).
    pub async fn condense_cascade(&self, session_id: &str) -> Result<()> {
        loop {
            let counts = self.store.uncondensed_level_counts(session_id)?;
            let fanout = self.config.compaction.condensation_fanout;
            let Some((level, _)) = counts.into_iter().find(|(_, c)| *c as usize >= fanout) else {
                break;
            };

            let oldest = self.store.uncondensed_summaries_at_level(session_id, level)?;
            let batch: Vec<_> = oldest.into_iter().take(fanout).collect();
            let text: String = batch
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            let result = ladder::escalate_or_force_truncated(
                self.llm.as_ref(),
                &text,
                self.config.compaction.condensation_target_tokens,
                self.config.compaction.overshoot_factor,
            )
            .await;

            let children: Vec<Child> = batch.iter().map(|s| Child::Summary(s.id)).collect();
            self.store.insert_summary(
                session_id,
                level + 1,
                result.kind,
                &result.content,
                result.token_estimate,
                &children,
            )?;
            info!(session_id, level, "condensed 5 summaries into level {}", level + 1);
        }
        Ok(())
    }
}

/// Flatten a message block into the text the ladder summarizes,
/// prefixing each entry with its role so the prompt reads as a
/// transcript rather than a blob (§9 "tagged variants" carried through
/// to summarization input).
fn render_block(block: &[Message]) -> String {
    block
        .iter()
        .map(|m| format!("[{:?} #{}] {}", m.role, m.transcript_offset, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
