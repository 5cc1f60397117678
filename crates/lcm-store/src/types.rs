//! Query result shapes that don't belong on the persistent entities
//! themselves (search hits, descriptions, totals).

use lcm_core::{FileRef, Id, Message, Summary};

/// Which content `grep` should search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Messages,
    Summaries,
    Both,
}

/// Lexical search mode (§4.A/§4.G): full-text or bounded regex. No
/// semantic/vector search (Non-goals, spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Fts,
    Regex,
}

/// One matching row before grouping.
#[derive(Debug, Clone)]
pub struct Hit {
    pub id: Id,
    pub transcript_offset: i64,
    pub snippet: String,
}

/// Hits sharing a covering summary (§4.A grouping policy), ordered by
/// `transcript_offset` ascending within the group.
#[derive(Debug, Clone)]
pub struct HitGroup {
    pub covering: Id,
    pub hits: Vec<Hit>,
}

/// Either side of an `id` lookup: a message, a summary, or a file
/// reference, resolved by [`crate::Store::get_by_id`].
#[derive(Debug, Clone)]
pub enum Resolved {
    Message(Message),
    Summary(Summary),
    File(FileRef),
}

/// A short, one-line preview of a DAG child, as returned by `expand`.
#[derive(Debug, Clone)]
pub struct ChildPreview {
    pub id: Id,
    pub preview: String,
    pub token_estimate: u32,
}

/// Aggregate token pressure for a session (§4.D): the sum the compaction
/// engine compares against τ_soft/τ_hard.
#[derive(Debug, Clone, Default)]
pub struct SessionTotals {
    pub message_count: i64,
    pub unsummarized_tokens: i64,
    pub uncondensed_summary_tokens: i64,
    pub summary_counts_by_level: Vec<(i32, i64)>,
    pub dag_depth: i32,
}

impl SessionTotals {
    /// `session_totals.tokens` from §4.D: unsummarized message tokens
    /// plus uncondensed summary tokens.
    pub fn tokens(&self) -> i64 {
        self.unsummarized_tokens + self.uncondensed_summary_tokens
    }
}

fn snippet_of(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len).collect();
        format!("{truncated}…")
    }
}

pub(crate) fn preview(content: &str) -> String {
    snippet_of(content.trim(), 120)
}
