//! The four persistent entities: session, message, summary, file reference
//! (§3 Data Model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    ToolUse,
    ToolResult,
}

/// One agent conversation, identified by an externally-supplied opaque
/// string. Created lazily on first write; never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable record of one transcript entry.
///
/// Invariant: once inserted, only `summarized_by` may transition from
/// `None` to a specific summary id, and only once. Content is never
/// mutated. At most one message exists per `(session_id,
/// transcript_offset)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub token_estimate: u32,
    pub created_at: DateTime<Utc>,
    pub transcript_offset: i64,
    pub summarized_by: Option<i64>,
}

/// The fidelity level a summary was produced at, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    PreserveDetails,
    BulletPoints,
    Truncated,
}

/// A node in the summary DAG.
///
/// Invariants (§3): a leaf's (`level == 0`) children are message ids
/// forming a contiguous run by `transcript_offset`, all with
/// `summarized_by == Some(self.id)`. A level-*k* summary's children are
/// level-(*k*-1) summaries, contiguous by the ranges they cover, each with
/// `condensed_by == Some(self.id)`. The DAG has no cycles because `level`
/// strictly decreases along `children`. A summary is immutable except
/// that `condensed_by` may transition `None` -> `Some(id)` once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub session_id: String,
    pub level: i32,
    pub kind: SummaryKind,
    pub content: String,
    pub token_estimate: u32,
    pub created_at: DateTime<Utc>,
    pub condensed_by: Option<i64>,
    /// The transcript-offset range this summary covers, inclusive, derived
    /// from its children at insertion time.
    pub covered_start: i64,
    pub covered_end: i64,
}

impl Summary {
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    /// A summary is top-level when nothing has condensed it yet.
    pub fn is_top_level(&self) -> bool {
        self.condensed_by.is_none()
    }
}

/// A child edge of the summary DAG, either a message id (leaf children) or
/// a lower-level summary id (condensed children). Stored in a dedicated
/// relation with `child_id` unique, never embedded in the summary row, so
/// invariant (2) is an SQL check and updates stay O(1) (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Message(i64),
    Summary(i64),
}

/// A deduplicated reference to a large blob diverted out of the message
/// log, surfaced as `"F" + id`. Keyed by `(path, sha256)`: identical
/// content at the same path deduplicates, a changed hash creates a new
/// file id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub id: i64,
    pub session_id: String,
    pub path: String,
    pub sha256: String,
    pub size: i64,
    pub first_seen_message_id: i64,
    pub last_seen_message_id: i64,
    pub snippet: Option<String>,
}
