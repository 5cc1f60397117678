//! Full-text and regex search, grouped by covering summary (§4.A).
//!
//! Full-text search runs against the `content_fts` virtual table kept in
//! sync by insert triggers. Regex search is a linear scan bounded by an
//! explicit result cap and wall-clock deadline — the `regex` crate has no
//! built-in timeout, so the deadline is checked between rows rather than
//! mid-match (§9 AMBIENT note), which bounds catastrophic patterns in
//! practice without needing a matcher-level cancellation hook.

use std::time::{Duration, Instant};

use regex::Regex;
use rusqlite::params;

use lcm_core::Id;

use crate::error::{Result, StoreError};
use crate::page::{Page, PageToken};
use crate::store::Store;
use crate::types::{preview, Hit, HitGroup, Scope};

const DEFAULT_RESULT_CAP: usize = 100;
const DEFAULT_REGEX_TIMEOUT_MS: u64 = 500;

impl Store {
    pub fn fts_search(
        &self,
        session_id: &str,
        query: &str,
        scope: Scope,
        page: PageToken,
    ) -> Result<Page<HitGroup>> {
        if query.trim().is_empty() {
            return Err(StoreError::Input("empty query".to_string()));
        }
        let conn = self.conn().lock().unwrap();
        let kind_filter = scope_sql(scope);
        let sql = format!(
            "SELECT kind, ref_id FROM content_fts
             WHERE session_id = ?1 AND content_fts MATCH ?2 {kind_filter}
             ORDER BY rank
             LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![session_id, fts_escape(query), DEFAULT_RESULT_CAP as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut raw = Vec::with_capacity(rows.len());
        for (kind, ref_id) in rows {
            raw.push(resolve_raw_hit(&conn, &kind, ref_id)?);
        }
        drop(conn);

        let groups = group_by_covering(self, raw)?;
        Ok(Page::slice(groups, page, |g| g.covering.value()))
    }

    pub fn regex_search(
        &self,
        session_id: &str,
        pattern: &str,
        scope: Scope,
        page: PageToken,
    ) -> Result<Page<HitGroup>> {
        let re =
            Regex::new(pattern).map_err(|e| StoreError::Input(format!("bad regex: {e}")))?;
        let deadline = Instant::now() + Duration::from_millis(DEFAULT_REGEX_TIMEOUT_MS);

        let mut raw = Vec::new();
        let mut truncated = false;

        if matches!(scope, Scope::Messages | Scope::Both) {
            let conn = self.conn().lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, content, transcript_offset FROM messages
                 WHERE session_id = ?1 ORDER BY transcript_offset ASC",
            )?;
            let rows = stmt
                .query_map(params![session_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);
            drop(conn);
            scan_rows(
                rows,
                &re,
                deadline,
                &mut raw,
                &mut truncated,
                |id, offset, snippet| RawHit {
                    id: Id::Message(id),
                    transcript_offset: offset,
                    snippet,
                },
            );
        }

        if matches!(scope, Scope::Summaries | Scope::Both) && !truncated {
            let conn = self.conn().lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, content, covered_start FROM summaries
                 WHERE session_id = ?1 ORDER BY covered_start ASC",
            )?;
            let rows = stmt
                .query_map(params![session_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);
            drop(conn);
            scan_rows(
                rows,
                &re,
                deadline,
                &mut raw,
                &mut truncated,
                |id, offset, snippet| RawHit {
                    id: Id::Summary(id),
                    transcript_offset: offset,
                    snippet,
                },
            );
        }

        let groups = group_by_covering(self, raw)?;
        let mut result = Page::slice(groups, page, |g| g.covering.value());
        result.truncated = truncated;
        Ok(result)
    }
}

struct RawHit {
    id: Id,
    transcript_offset: i64,
    snippet: String,
}

fn scan_rows(
    rows: Vec<(i64, String, i64)>,
    re: &Regex,
    deadline: Instant,
    out: &mut Vec<RawHit>,
    truncated: &mut bool,
    make: impl Fn(i64, i64, String) -> RawHit,
) {
    for (i, (id, content, offset)) in rows.into_iter().enumerate() {
        if i % 16 == 0 && Instant::now() >= deadline {
            *truncated = true;
            break;
        }
        if out.len() >= DEFAULT_RESULT_CAP {
            *truncated = true;
            break;
        }
        if let Some(m) = re.find(&content) {
            out.push(make(id, offset, preview(m.as_str())));
        }
    }
}

fn resolve_raw_hit(conn: &rusqlite::Connection, kind: &str, ref_id: i64) -> Result<RawHit> {
    if kind == "message" {
        let (content, offset): (String, i64) = conn.query_row(
            "SELECT content, transcript_offset FROM messages WHERE id = ?1",
            params![ref_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RawHit {
            id: Id::Message(ref_id),
            transcript_offset: offset,
            snippet: preview(&content),
        })
    } else {
        let (content, offset): (String, i64) = conn.query_row(
            "SELECT content, covered_start FROM summaries WHERE id = ?1",
            params![ref_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RawHit {
            id: Id::Summary(ref_id),
            transcript_offset: offset,
            snippet: preview(&content),
        })
    }
}

fn group_by_covering(store: &Store, raw: Vec<RawHit>) -> Result<Vec<HitGroup>> {
    let mut groups: Vec<HitGroup> = Vec::new();
    let mut index: std::collections::HashMap<Id, usize> = std::collections::HashMap::new();

    for r in raw {
        let covering = store.covering_summary(r.id)?;
        let hit = Hit {
            id: r.id,
            transcript_offset: r.transcript_offset,
            snippet: r.snippet,
        };
        match index.get(&covering) {
            Some(&i) => groups[i].hits.push(hit),
            None => {
                index.insert(covering, groups.len());
                groups.push(HitGroup {
                    covering,
                    hits: vec![hit],
                });
            }
        }
    }

    for group in &mut groups {
        group.hits.sort_by_key(|h| h.transcript_offset);
    }
    groups.sort_by_key(|g| g.hits.first().map(|h| h.transcript_offset).unwrap_or(0));
    Ok(groups)
}

fn scope_sql(scope: Scope) -> &'static str {
    match scope {
        Scope::Messages => "AND kind = 'message'",
        Scope::Summaries => "AND kind = 'summary'",
        Scope::Both => "",
    }
}

/// FTS5 query syntax treats `"`, `*`, `:`, `-`, `(`, `)` specially.
/// Wrapping the whole query in double quotes makes it a phrase match,
/// which is what a code agent typing a literal string expects from
/// `grep`.
fn fts_escape(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}
