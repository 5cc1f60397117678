//! The SQLite-backed message log and summary DAG (§4.A).
//!
//! One [`Connection`] behind a [`Mutex`], WAL mode, forward-only
//! migrations versioned in a `meta` table: every message and summary,
//! for every session, in one relational schema with an FTS index.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use lcm_core::{Child, FileRef, Id, Message, Role, Summary, SummaryKind};

use crate::error::{Result, StoreError};
use crate::types::{preview, ChildPreview, Resolved, SessionTotals};

const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

/// A durable handle to one LCM database file, shared by every crate that
/// needs to read or write the message/summary/file store.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the database at `path`, applying
    /// migrations and WAL pragmas.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// An in-memory store, used by tests and by callers that want
    /// isolation without touching disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let version: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(CAST(value AS INTEGER)), 0) FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        if version < 1 {
            conn.execute_batch(MIGRATION_001)?;
        }
        Ok(())
    }

    /// Create the session row if it doesn't exist yet (lazy creation,
    /// §3 "Created lazily on first write; never deleted by the core").
    pub fn init_session(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        ensure_session(&conn, session_id)
    }

    // ---------------------------------------------------------------
    // Messages
    // ---------------------------------------------------------------

    /// Append one message at `transcript_offset`. Idempotent: a
    /// duplicate `(session_id, transcript_offset)` is a silent no-op
    /// that returns the already-stored row (§4.E reentrancy).
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        transcript_offset: i64,
    ) -> Result<Message> {
        let token_estimate = lcm_core::tokens::estimate(content);
        let created_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        ensure_session(&conn, session_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO messages
                (session_id, role, content, token_estimate, created_at, transcript_offset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                role_to_str(role),
                content,
                token_estimate,
                created_at.to_rfc3339(),
                transcript_offset
            ],
        )?;
        fetch_message_by_offset(&conn, session_id, transcript_offset)?
            .ok_or_else(|| StoreError::Invariant("message vanished after insert".to_string()))
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        let conn = self.conn.lock().unwrap();
        fetch_message(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("message {id}")))
    }

    /// Messages with `summarized_by IS NULL`, oldest first (§4.A
    /// `unsummarized_messages`).
    pub fn unsummarized_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, token_estimate, created_at, transcript_offset, summarized_by
             FROM messages
             WHERE session_id = ?1 AND summarized_by IS NULL
             ORDER BY transcript_offset ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // Summaries
    // ---------------------------------------------------------------

    /// Insert a new summary and, in the same transaction, mark every
    /// child as consumed (`summarized_by` for message children,
    /// `condensed_by` for summary children). Steps (a)/(b) of §4.D must
    /// never be visible independently, so this is the one write path
    /// `lcm-compaction` uses; the narrower `mark_summarized`/
    /// `mark_condensed` below exist for direct inspection and tests.
    pub fn insert_summary(
        &self,
        session_id: &str,
        level: i32,
        kind: SummaryKind,
        content: &str,
        token_estimate: u32,
        children: &[Child],
    ) -> Result<Summary> {
        if children.is_empty() {
            return Err(StoreError::Input(
                "a summary must have at least one child".to_string(),
            ));
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let (covered_start, covered_end) = match (level, children[0]) {
            (0, Child::Message(_)) => {
                let ids: Vec<i64> = children
                    .iter()
                    .map(|c| match c {
                        Child::Message(id) => *id,
                        Child::Summary(_) => unreachable!(),
                    })
                    .collect();
                message_offset_range(&tx, &ids)?
            }
            (k, Child::Summary(_)) if k >= 1 => {
                let ids: Vec<i64> = children
                    .iter()
                    .map(|c| match c {
                        Child::Summary(id) => *id,
                        Child::Message(_) => unreachable!(),
                    })
                    .collect();
                summary_range(&tx, &ids)?
            }
            _ => {
                return Err(StoreError::Input(
                    "children kind must match level (0 => messages, >=1 => summaries)".to_string(),
                ))
            }
        };

        let created_at = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO summaries
                (session_id, level, kind, content, token_estimate, created_at, covered_start, covered_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session_id,
                level,
                kind_to_str(kind),
                content,
                token_estimate,
                created_at,
                covered_start,
                covered_end
            ],
        )?;
        let summary_id = tx.last_insert_rowid();

        for (position, child) in children.iter().enumerate() {
            match child {
                Child::Message(msg_id) => {
                    tx.execute(
                        "INSERT INTO summary_children (parent_id, child_kind, child_id, position)
                         VALUES (?1, 'message', ?2, ?3)",
                        params![summary_id, msg_id, position as i64],
                    )?;
                    let changed = tx.execute(
                        "UPDATE messages SET summarized_by = ?1
                         WHERE id = ?2 AND summarized_by IS NULL",
                        params![summary_id, msg_id],
                    )?;
                    if changed != 1 {
                        return Err(StoreError::Invariant(format!(
                            "message {msg_id} already summarized"
                        )));
                    }
                }
                Child::Summary(child_summary_id) => {
                    tx.execute(
                        "INSERT INTO summary_children (parent_id, child_kind, child_id, position)
                         VALUES (?1, 'summary', ?2, ?3)",
                        params![summary_id, child_summary_id, position as i64],
                    )?;
                    let changed = tx.execute(
                        "UPDATE summaries SET condensed_by = ?1
                         WHERE id = ?2 AND condensed_by IS NULL AND level = ?3",
                        params![summary_id, child_summary_id, level - 1],
                    )?;
                    if changed != 1 {
                        return Err(StoreError::Invariant(format!(
                            "summary {child_summary_id} already condensed or wrong level"
                        )));
                    }
                }
            }
        }

        tx.commit()?;
        let conn = self.conn.lock().unwrap();
        fetch_summary(&conn, summary_id)?
            .ok_or_else(|| StoreError::Invariant("summary vanished after insert".to_string()))
    }

    /// Mark a set of already-inserted leaf summary's children as
    /// summarized. Exposed for the store-level contract named in §4.A;
    /// production callers should prefer [`Store::insert_summary`], which
    /// performs this atomically alongside the insert.
    pub fn mark_summarized(&self, message_ids: &[i64], summary_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for id in message_ids {
            let changed = conn.execute(
                "UPDATE messages SET summarized_by = ?1 WHERE id = ?2 AND summarized_by IS NULL",
                params![summary_id, id],
            )?;
            if changed != 1 {
                return Err(StoreError::Invariant(format!(
                    "message {id} already summarized"
                )));
            }
        }
        Ok(())
    }

    /// Mark a set of already-inserted summaries as condensed into
    /// `parent_id`. See the note on [`Store::mark_summarized`].
    pub fn mark_condensed(&self, child_summary_ids: &[i64], parent_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for id in child_summary_ids {
            let changed = conn.execute(
                "UPDATE summaries SET condensed_by = ?1 WHERE id = ?2 AND condensed_by IS NULL",
                params![parent_id, id],
            )?;
            if changed != 1 {
                return Err(StoreError::Invariant(format!(
                    "summary {id} already condensed"
                )));
            }
        }
        Ok(())
    }

    pub fn get_summary(&self, id: i64) -> Result<Summary> {
        let conn = self.conn.lock().unwrap();
        fetch_summary(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("summary S{id}")))
    }

    /// Uncondensed summaries at `level`, oldest first by the ranges they
    /// cover — what the compaction engine drains for condensation
    /// (§4.D), generalized beyond level 0 since condensation cascades.
    pub fn uncondensed_summaries_at_level(
        &self,
        session_id: &str,
        level: i32,
    ) -> Result<Vec<Summary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, level, kind, content, token_estimate, created_at,
                    condensed_by, covered_start, covered_end
             FROM summaries
             WHERE session_id = ?1 AND level = ?2 AND condensed_by IS NULL
             ORDER BY covered_start ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id, level], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// How many uncondensed summaries exist at each level currently
    /// present in the DAG, used to find which levels have reached the
    /// condensation fan-out `C` (§4.D).
    pub fn uncondensed_level_counts(&self, session_id: &str) -> Result<Vec<(i32, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT level, COUNT(*) FROM summaries
             WHERE session_id = ?1 AND condensed_by IS NULL
             GROUP BY level ORDER BY level ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Summaries still `condensed_by IS NULL`, i.e. the current roots of
    /// the DAG, in transcript order (§4.A `top_level_summaries`, used
    /// directly by `lcm-inject`).
    pub fn top_level_summaries(&self, session_id: &str) -> Result<Vec<Summary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, level, kind, content, token_estimate, created_at,
                    condensed_by, covered_start, covered_end
             FROM summaries
             WHERE session_id = ?1 AND condensed_by IS NULL
             ORDER BY covered_start ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The ordered, immediate children of a summary, with short previews
    /// (`expand`, §4.G).
    pub fn children_of(&self, summary_id: i64) -> Result<Vec<ChildPreview>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT child_kind, child_id FROM summary_children
             WHERE parent_id = ?1 ORDER BY position ASC",
        )?;
        let edges = stmt
            .query_map(params![summary_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut out = Vec::with_capacity(edges.len());
        for (kind, id) in edges {
            if kind == "message" {
                let m = fetch_message(&conn, id)?
                    .ok_or_else(|| StoreError::Invariant(format!("dangling message child {id}")))?;
                out.push(ChildPreview {
                    id: Id::Message(id),
                    preview: preview(&m.content),
                    token_estimate: m.token_estimate,
                });
            } else {
                let s = fetch_summary(&conn, id)?
                    .ok_or_else(|| StoreError::Invariant(format!("dangling summary child {id}")))?;
                out.push(ChildPreview {
                    id: Id::Summary(id),
                    preview: preview(&s.content),
                    token_estimate: s.token_estimate,
                });
            }
        }
        Ok(out)
    }

    /// Walk `summarized_by`/`condensed_by` upward from any id to the
    /// highest-level ancestor still `fresh` (§4.A covering-summary rule
    /// used to group search hits).
    pub fn covering_summary(&self, id: Id) -> Result<Id> {
        let conn = self.conn.lock().unwrap();
        match id {
            Id::Message(msg_id) => {
                let m = fetch_message(&conn, msg_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("message {msg_id}")))?;
                match m.summarized_by {
                    None => Ok(Id::Message(msg_id)),
                    Some(summary_id) => walk_condensed_chain(&conn, summary_id),
                }
            }
            Id::Summary(summary_id) => walk_condensed_chain(&conn, summary_id),
            Id::File(file_id) => Ok(Id::File(file_id)),
        }
    }

    // ---------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------

    /// Insert or refresh a file reference. Keyed by `(session_id, path,
    /// sha256)` (§9 open question: preserve provenance over dedup
    /// reach). An existing row has its `last_seen_message_id` advanced.
    ///
    /// `message_id == 0` is a reservation sentinel for the two-phase
    /// insert capture needs (a diverted message's content must name its
    /// file id, but a file's `first_seen_message_id` names its message):
    /// it finds-or-creates the row without moving either pointer, so a
    /// later call with the real message id can fill them in once it's
    /// known.
    pub fn upsert_file(
        &self,
        session_id: &str,
        path: &str,
        sha256: &str,
        size: i64,
        message_id: i64,
        snippet: Option<&str>,
    ) -> Result<FileRef> {
        let conn = self.conn.lock().unwrap();
        ensure_session(&conn, session_id)?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM files WHERE session_id = ?1 AND path = ?2 AND sha256 = ?3",
                params![session_id, path, sha256],
                |row| row.get(0),
            )
            .optional()?;

        let id = if let Some(id) = existing {
            if message_id != 0 {
                conn.execute(
                    "UPDATE files SET last_seen_message_id = ?1,
                        first_seen_message_id = CASE WHEN first_seen_message_id = 0 THEN ?1 ELSE first_seen_message_id END
                     WHERE id = ?2",
                    params![message_id, id],
                )?;
            }
            id
        } else {
            conn.execute(
                "INSERT INTO files
                    (session_id, path, sha256, size, first_seen_message_id, last_seen_message_id, snippet)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)",
                params![session_id, path, sha256, size, message_id, snippet],
            )?;
            conn.last_insert_rowid()
        };

        fetch_file(&conn, id)?.ok_or_else(|| StoreError::Invariant("file vanished after upsert".to_string()))
    }

    pub fn get_file(&self, id: i64) -> Result<FileRef> {
        let conn = self.conn.lock().unwrap();
        fetch_file(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("file F{id}")))
    }

    // ---------------------------------------------------------------
    // Lookup, totals
    // ---------------------------------------------------------------

    pub fn get_by_id(&self, id: Id) -> Result<Resolved> {
        match id {
            Id::Message(n) => self.get_message(n).map(Resolved::Message),
            Id::Summary(n) => self.get_summary(n).map(Resolved::Summary),
            Id::File(n) => self.get_file(n).map(Resolved::File),
        }
    }

    /// Token pressure and DAG shape for a session (§4.D `session_totals`,
    /// §4.G `status`).
    pub fn session_totals(&self, session_id: &str) -> Result<SessionTotals> {
        let conn = self.conn.lock().unwrap();
        let message_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        let unsummarized_tokens: i64 = conn.query_row(
            "SELECT COALESCE(SUM(token_estimate), 0) FROM messages
             WHERE session_id = ?1 AND summarized_by IS NULL",
            params![session_id],
            |row| row.get(0),
        )?;
        let uncondensed_summary_tokens: i64 = conn.query_row(
            "SELECT COALESCE(SUM(token_estimate), 0) FROM summaries
             WHERE session_id = ?1 AND condensed_by IS NULL",
            params![session_id],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT level, COUNT(*) FROM summaries WHERE session_id = ?1 GROUP BY level ORDER BY level ASC",
        )?;
        let summary_counts_by_level = stmt
            .query_map(params![session_id], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        let dag_depth: Option<i32> = conn
            .query_row(
                "SELECT MAX(level) FROM summaries WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(SessionTotals {
            message_count,
            unsummarized_tokens,
            uncondensed_summary_tokens,
            summary_counts_by_level,
            dag_depth: dag_depth.map(|d| d + 1).unwrap_or(0),
        })
    }

    /// The next `transcript_offset` capture should append at: one past
    /// the highest stored so far, or 1 if the session has no messages
    /// yet (§4.E, §8 invariant 5: offsets are gap-free from 1).
    pub fn next_transcript_offset(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let max: Option<i64> = conn
            .query_row(
                "SELECT MAX(transcript_offset) FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max.map(|m| m + 1).unwrap_or(1))
    }

    pub(crate) fn conn(&self) -> &Mutex<Connection> {
        &self.conn
    }
}

fn walk_condensed_chain(conn: &Connection, mut summary_id: i64) -> Result<Id> {
    loop {
        let condensed_by: Option<i64> = conn
            .query_row(
                "SELECT condensed_by FROM summaries WHERE id = ?1",
                params![summary_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("summary S{summary_id}")))?;
        match condensed_by {
            Some(parent) => summary_id = parent,
            None => return Ok(Id::Summary(summary_id)),
        }
    }
}

fn ensure_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sessions (session_id, created_at) VALUES (?1, ?2)",
        params![session_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn message_offset_range(conn: &Connection, ids: &[i64]) -> Result<(i64, i64)> {
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT MIN(transcript_offset), MAX(transcript_offset) FROM messages WHERE id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
    let (min, max): (Option<i64>, Option<i64>) =
        stmt.query_row(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?;
    match (min, max) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(StoreError::Input("no such messages".to_string())),
    }
}

fn summary_range(conn: &Connection, ids: &[i64]) -> Result<(i64, i64)> {
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT MIN(covered_start), MAX(covered_end) FROM summaries WHERE id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
    let (min, max): (Option<i64>, Option<i64>) =
        stmt.query_row(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?;
    match (min, max) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(StoreError::Input("no such summaries".to_string())),
    }
}

fn fetch_message(conn: &Connection, id: i64) -> Result<Option<Message>> {
    conn.query_row(
        "SELECT id, session_id, role, content, token_estimate, created_at, transcript_offset, summarized_by
         FROM messages WHERE id = ?1",
        params![id],
        row_to_message,
    )
    .optional()
    .map_err(StoreError::from)
}

fn fetch_message_by_offset(
    conn: &Connection,
    session_id: &str,
    transcript_offset: i64,
) -> Result<Option<Message>> {
    conn.query_row(
        "SELECT id, session_id, role, content, token_estimate, created_at, transcript_offset, summarized_by
         FROM messages WHERE session_id = ?1 AND transcript_offset = ?2",
        params![session_id, transcript_offset],
        row_to_message,
    )
    .optional()
    .map_err(StoreError::from)
}

fn fetch_summary(conn: &Connection, id: i64) -> Result<Option<Summary>> {
    conn.query_row(
        "SELECT id, session_id, level, kind, content, token_estimate, created_at,
                condensed_by, covered_start, covered_end
         FROM summaries WHERE id = ?1",
        params![id],
        row_to_summary,
    )
    .optional()
    .map_err(StoreError::from)
}

fn fetch_file(conn: &Connection, id: i64) -> Result<Option<FileRef>> {
    conn.query_row(
        "SELECT id, session_id, path, sha256, size, first_seen_message_id, last_seen_message_id, snippet
         FROM files WHERE id = ?1",
        params![id],
        |row| {
            Ok(FileRef {
                id: row.get(0)?,
                session_id: row.get(1)?,
                path: row.get(2)?,
                sha256: row.get(3)?,
                size: row.get(4)?,
                first_seen_message_id: row.get(5)?,
                last_seen_message_id: row.get(6)?,
                snippet: row.get(7)?,
            })
        },
    )
    .optional()
    .map_err(StoreError::from)
}

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let created_at: String = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: str_to_role(&role),
        content: row.get(3)?,
        token_estimate: row.get(4)?,
        created_at: parse_ts(&created_at),
        transcript_offset: row.get(6)?,
        summarized_by: row.get(7)?,
    })
}

fn row_to_summary(row: &Row) -> rusqlite::Result<Summary> {
    let kind: String = row.get(3)?;
    let created_at: String = row.get(6)?;
    Ok(Summary {
        id: row.get(0)?,
        session_id: row.get(1)?,
        level: row.get(2)?,
        kind: str_to_kind(&kind),
        content: row.get(4)?,
        token_estimate: row.get(5)?,
        created_at: parse_ts(&created_at),
        condensed_by: row.get(7)?,
        covered_start: row.get(8)?,
        covered_end: row.get(9)?,
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::ToolUse => "tool_use",
        Role::ToolResult => "tool_result",
    }
}

fn str_to_role(s: &str) -> Role {
    match s {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "system" => Role::System,
        "tool_use" => Role::ToolUse,
        "tool_result" => Role::ToolResult,
        _ => Role::System,
    }
}

fn kind_to_str(kind: SummaryKind) -> &'static str {
    match kind {
        SummaryKind::PreserveDetails => "preserve_details",
        SummaryKind::BulletPoints => "bullet_points",
        SummaryKind::Truncated => "truncated",
    }
}

fn str_to_kind(s: &str) -> SummaryKind {
    match s {
        "preserve_details" => SummaryKind::PreserveDetails,
        "bullet_points" => SummaryKind::BulletPoints,
        _ => SummaryKind::Truncated,
    }
}
