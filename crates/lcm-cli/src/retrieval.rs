//! The retrieval tools (§4.G): `status`, `grep`, `describe`, `expand`.
//!
//! A thin wrapper over `lcm-store` — every verb here is a direct
//! pass-through to a `Store` method with its arguments parsed from CLI
//! text and its result serialized to the structured JSON the host's RPC
//! surface expects (§6 "six verbs ... all returning structured
//! results"). No business logic lives here; it belongs in `lcm-store`.

use std::str::FromStr;

use serde::Serialize;

use lcm_core::{Id, LcmError};
use lcm_store::{Page, PageToken, Resolved, Scope, SearchMode, Store};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub message_count: i64,
    pub unsummarized_tokens: i64,
    pub uncondensed_summary_tokens: i64,
    pub summary_counts_by_level: Vec<(i32, i64)>,
    pub dag_depth: i32,
}

pub fn status(store: &Store, session_id: &str) -> Result<StatusReport, LcmError> {
    let totals = store.session_totals(session_id)?;
    Ok(StatusReport {
        message_count: totals.message_count,
        unsummarized_tokens: totals.unsummarized_tokens,
        uncondensed_summary_tokens: totals.uncondensed_summary_tokens,
        summary_counts_by_level: totals.summary_counts_by_level,
        dag_depth: totals.dag_depth,
    })
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Description {
    Message {
        id: i64,
        transcript_offset: i64,
        summarized_by: Option<i64>,
        token_estimate: u32,
        created_at: String,
    },
    Summary {
        id: String,
        level: i32,
        covered_start: i64,
        covered_end: i64,
        condensed_by: Option<i64>,
        token_estimate: u32,
        created_at: String,
    },
    File {
        id: String,
        path: String,
        size: i64,
        first_seen_message_id: i64,
        last_seen_message_id: i64,
    },
}

/// `describe(id)`: metadata for any `S`/`F`/bare-integer id (§4.G).
pub fn describe(store: &Store, raw_id: &str) -> Result<Description, LcmError> {
    let id = Id::from_str(raw_id)?;
    let resolved = store.get_by_id(id)?;
    Ok(match resolved {
        Resolved::Message(m) => Description::Message {
            id: m.id,
            transcript_offset: m.transcript_offset,
            summarized_by: m.summarized_by,
            token_estimate: m.token_estimate,
            created_at: m.created_at.to_rfc3339(),
        },
        Resolved::Summary(s) => Description::Summary {
            id: format!("S{}", s.id),
            level: s.level,
            covered_start: s.covered_start,
            covered_end: s.covered_end,
            condensed_by: s.condensed_by,
            token_estimate: s.token_estimate,
            created_at: s.created_at.to_rfc3339(),
        },
        Resolved::File(f) => Description::File {
            id: format!("F{}", f.id),
            path: f.path,
            size: f.size,
            first_seen_message_id: f.first_seen_message_id,
            last_seen_message_id: f.last_seen_message_id,
        },
    })
}

#[derive(Debug, Serialize)]
pub struct ExpandedChild {
    pub id: String,
    pub preview: String,
    pub token_estimate: u32,
}

/// `expand(S-id)`: the ordered immediate children of a summary, with
/// short previews, so the caller can recurse (§4.G).
pub fn expand(store: &Store, raw_id: &str) -> Result<Vec<ExpandedChild>, LcmError> {
    let id = Id::from_str(raw_id)?;
    let Id::Summary(summary_id) = id else {
        return Err(LcmError::InputError(format!(
            "expand requires a summary id (S<n>), got {raw_id}"
        )));
    };
    let children = store.children_of(summary_id)?;
    Ok(children
        .into_iter()
        .map(|c| ExpandedChild {
            id: c.id.to_string(),
            preview: c.preview,
            token_estimate: c.token_estimate,
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct GrepHit {
    pub id: String,
    pub transcript_offset: i64,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub struct GrepGroup {
    pub covering: String,
    pub hits: Vec<GrepHit>,
}

#[derive(Debug, Serialize)]
pub struct GrepResult {
    pub groups: Vec<GrepGroup>,
    pub next_page: Option<String>,
    pub truncated: bool,
}

/// `grep(session, query, mode, scope, page?)`: paginated hits grouped
/// by covering summary (§4.A, §4.G).
pub fn grep(
    store: &Store,
    session_id: &str,
    query: &str,
    mode: SearchMode,
    scope: Scope,
    page: Option<&str>,
) -> Result<GrepResult, LcmError> {
    let token = match page {
        Some(p) => PageToken::decode(p)?,
        None => PageToken::first(),
    };
    let Page {
        items,
        next,
        truncated,
    } = match mode {
        SearchMode::Fts => store.fts_search(session_id, query, scope, token)?,
        SearchMode::Regex => store.regex_search(session_id, query, scope, token)?,
    };
    Ok(GrepResult {
        groups: items
            .into_iter()
            .map(|g| GrepGroup {
                covering: g.covering.to_string(),
                hits: g
                    .hits
                    .into_iter()
                    .map(|h| GrepHit {
                        id: h.id.to_string(),
                        transcript_offset: h.transcript_offset,
                        snippet: h.snippet,
                    })
                    .collect(),
            })
            .collect(),
        next_page: next.map(|t| t.encode()),
        truncated,
    })
}

pub fn parse_scope(s: &str) -> Result<Scope, LcmError> {
    match s {
        "messages" => Ok(Scope::Messages),
        "summaries" => Ok(Scope::Summaries),
        "both" => Ok(Scope::Both),
        other => Err(LcmError::InputError(format!(
            "invalid scope {other:?}: expected messages, summaries, or both"
        ))),
    }
}

pub fn parse_mode(s: &str) -> Result<SearchMode, LcmError> {
    match s {
        "fts" => Ok(SearchMode::Fts),
        "regex" => Ok(SearchMode::Regex),
        other => Err(LcmError::InputError(format!(
            "invalid mode {other:?}: expected fts or regex"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcm_core::{Child, Role, SummaryKind};

    fn seed_condensed_session() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let mut leaf_ids = Vec::new();
        for batch in 0..5 {
            let mut msg_ids = Vec::new();
            for i in 0..2 {
                let offset = batch * 2 + i;
                let m = store
                    .append_message("sess", Role::User, &format!("msg {offset}"), offset)
                    .unwrap();
                msg_ids.push(m.id);
            }
            let leaf = store
                .insert_summary(
                    "sess",
                    0,
                    SummaryKind::BulletPoints,
                    &format!("leaf {batch}"),
                    5,
                    &msg_ids.iter().map(|id| Child::Message(*id)).collect::<Vec<_>>(),
                )
                .unwrap();
            leaf_ids.push(leaf.id);
        }
        let top = store
            .insert_summary(
                "sess",
                1,
                SummaryKind::BulletPoints,
                "condensed",
                20,
                &leaf_ids.iter().map(|id| Child::Summary(*id)).collect::<Vec<_>>(),
            )
            .unwrap();
        (store, top.id)
    }

    #[test]
    fn describe_a_level_one_summary_reports_its_covered_range_and_children() {
        let (store, top_id) = seed_condensed_session();
        let desc = describe(&store, &format!("S{top_id}")).unwrap();
        match desc {
            Description::Summary {
                level,
                covered_start,
                covered_end,
                condensed_by,
                ..
            } => {
                assert_eq!(level, 1);
                assert_eq!(covered_start, 0);
                assert_eq!(covered_end, 9);
                assert!(condensed_by.is_none());
            }
            other => panic!("expected a summary description, got {other:?}"),
        }
        let children = expand(&store, &format!("S{top_id}")).unwrap();
        assert_eq!(children.len(), 5);
    }

    #[test]
    fn expand_on_a_leaf_returns_its_underlying_message_ids() {
        let (store, top_id) = seed_condensed_session();
        let top_children = expand(&store, &format!("S{top_id}")).unwrap();
        let leaf_id = &top_children[0].id;
        let leaf_children = expand(&store, leaf_id).unwrap();
        assert_eq!(leaf_children.len(), 2);
        assert!(leaf_children.iter().all(|c| !c.id.starts_with('S')));
    }

    #[test]
    fn expand_rejects_a_message_id() {
        let store = Store::open_in_memory().unwrap();
        store.append_message("sess", Role::User, "hi", 0).unwrap();
        let err = expand(&store, "1").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn grep_finds_a_unique_phrase_grouped_under_its_leaf() {
        let store = Store::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let m = store
                .append_message("sess", Role::User, &format!("entry {i}"), i)
                .unwrap();
            ids.push(m.id);
        }
        store
            .append_message("sess", Role::User, "the unmistakable phrase here", 3)
            .unwrap();
        let leaf = store
            .insert_summary(
                "sess",
                0,
                SummaryKind::Truncated,
                "covers all four",
                5,
                &(0..3).map(|i| Child::Message(ids[i])).collect::<Vec<_>>(),
            )
            .unwrap();

        let result = grep(&store, "sess", "unmistakable phrase", SearchMode::Fts, Scope::Messages, None)
            .unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].hits.len(), 1);
        // That message isn't under `leaf` (only msgs 0-2 are), so it covers itself.
        assert_ne!(result.groups[0].covering, format!("S{}", leaf.id));
    }
}
