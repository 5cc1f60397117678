//! # lcm-store
//!
//! The immutable message log and summary DAG (§4.A): durable storage,
//! invariant-preserving writes, full-text and regex search. Built on
//! `rusqlite` (bundled SQLite, WAL mode): every message and summary in
//! one relational schema with an FTS index, shared across the whole
//! workspace.

mod error;
mod page;
mod search;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use page::{Page, PageToken, PAGE_SIZE};
pub use store::Store;
pub use types::{ChildPreview, Hit, HitGroup, Resolved, Scope, SearchMode, SessionTotals};

#[cfg(test)]
mod tests {
    use super::*;
    use lcm_core::{Child, Role, SummaryKind};

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn appends_and_reads_messages_in_order() {
        let s = store();
        s.append_message("sess", Role::User, "hello", 0).unwrap();
        s.append_message("sess", Role::Assistant, "hi there", 1)
            .unwrap();
        let msgs = s.unsummarized_messages("sess").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].transcript_offset, 0);
        assert_eq!(msgs[1].transcript_offset, 1);
    }

    #[test]
    fn duplicate_offset_is_a_noop() {
        let s = store();
        let a = s.append_message("sess", Role::User, "first", 0).unwrap();
        let b = s
            .append_message("sess", Role::User, "different text", 0)
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.content, b.content);
        assert_eq!(s.unsummarized_messages("sess").unwrap().len(), 1);
    }

    #[test]
    fn insert_leaf_summary_marks_children_atomically() {
        let s = store();
        let m1 = s.append_message("sess", Role::User, "one", 0).unwrap();
        let m2 = s
            .append_message("sess", Role::Assistant, "two", 1)
            .unwrap();
        let summary = s
            .insert_summary(
                "sess",
                0,
                SummaryKind::BulletPoints,
                "did one and two",
                10,
                &[Child::Message(m1.id), Child::Message(m2.id)],
            )
            .unwrap();
        assert_eq!(summary.covered_start, 0);
        assert_eq!(summary.covered_end, 1);
        assert!(s.unsummarized_messages("sess").unwrap().is_empty());
        let refreshed = s.get_message(m1.id).unwrap();
        assert_eq!(refreshed.summarized_by, Some(summary.id));
    }

    #[test]
    fn double_summarizing_a_message_is_rejected() {
        let s = store();
        let m1 = s.append_message("sess", Role::User, "one", 0).unwrap();
        s.insert_summary(
            "sess",
            0,
            SummaryKind::Truncated,
            "x",
            1,
            &[Child::Message(m1.id)],
        )
        .unwrap();
        let err = s.insert_summary(
            "sess",
            0,
            SummaryKind::Truncated,
            "y",
            1,
            &[Child::Message(m1.id)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn condensation_covers_child_ranges() {
        let s = store();
        let mut leaf_ids = Vec::new();
        for i in 0..5 {
            let m = s
                .append_message("sess", Role::User, &format!("msg {i}"), i)
                .unwrap();
            let leaf = s
                .insert_summary(
                    "sess",
                    0,
                    SummaryKind::Truncated,
                    "leaf",
                    5,
                    &[Child::Message(m.id)],
                )
                .unwrap();
            leaf_ids.push(leaf.id);
        }
        assert_eq!(s.uncondensed_summaries_at_level("sess", 0).unwrap().len(), 5);
        let children: Vec<Child> = leaf_ids.iter().map(|id| Child::Summary(*id)).collect();
        let condensed = s
            .insert_summary("sess", 1, SummaryKind::BulletPoints, "condensed", 20, &children)
            .unwrap();
        assert_eq!(condensed.covered_start, 0);
        assert_eq!(condensed.covered_end, 4);
        assert!(s
            .uncondensed_summaries_at_level("sess", 0)
            .unwrap()
            .is_empty());
        let top = s.top_level_summaries("sess").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, condensed.id);
    }

    #[test]
    fn covering_summary_walks_to_top() {
        let s = store();
        let m = s.append_message("sess", Role::User, "one", 0).unwrap();
        let leaf = s
            .insert_summary(
                "sess",
                0,
                SummaryKind::Truncated,
                "leaf",
                5,
                &[Child::Message(m.id)],
            )
            .unwrap();
        let top = s
            .insert_summary(
                "sess",
                1,
                SummaryKind::Truncated,
                "top",
                5,
                &[Child::Summary(leaf.id)],
            )
            .unwrap();
        let covering = s.covering_summary(lcm_core::Id::Message(m.id)).unwrap();
        assert_eq!(covering, lcm_core::Id::Summary(top.id));
    }

    #[test]
    fn uncovered_message_covers_itself() {
        let s = store();
        let m = s.append_message("sess", Role::User, "lonely", 0).unwrap();
        let covering = s.covering_summary(lcm_core::Id::Message(m.id)).unwrap();
        assert_eq!(covering, lcm_core::Id::Message(m.id));
    }

    #[test]
    fn fts_search_finds_unique_phrase() {
        let s = store();
        s.append_message("sess", Role::User, "the quick brown fox", 0)
            .unwrap();
        s.append_message("sess", Role::User, "something unrelated", 1)
            .unwrap();
        let page = s
            .fts_search("sess", "quick brown", Scope::Messages, PageToken::first())
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].hits.len(), 1);
    }

    #[test]
    fn regex_search_groups_by_covering_summary() {
        let s = store();
        let mut ids = Vec::new();
        for i in 0..3 {
            let m = s
                .append_message("sess", Role::User, &format!("error code E{i}"), i)
                .unwrap();
            ids.push(m.id);
        }
        s.insert_summary(
            "sess",
            0,
            SummaryKind::Truncated,
            "covers all three",
            5,
            &ids.iter().map(|id| Child::Message(*id)).collect::<Vec<_>>(),
        )
        .unwrap();
        let page = s
            .regex_search("sess", r"E\d", Scope::Messages, PageToken::first())
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].hits.len(), 3);
    }

    #[test]
    fn upsert_file_dedups_by_path_and_hash() {
        let s = store();
        let m = s.append_message("sess", Role::ToolResult, "F1", 0).unwrap();
        let f1 = s
            .upsert_file("sess", "src/lib.rs", "abc123", 1024, m.id, Some("snippet"))
            .unwrap();
        let f2 = s
            .upsert_file("sess", "src/lib.rs", "abc123", 1024, m.id, Some("snippet"))
            .unwrap();
        assert_eq!(f1.id, f2.id);
        let f3 = s
            .upsert_file("sess", "src/lib.rs", "def456", 2048, m.id, None)
            .unwrap();
        assert_ne!(f1.id, f3.id);
    }

    #[test]
    fn session_totals_reflect_pressure() {
        let s = store();
        s.append_message("sess", Role::User, &"x".repeat(400), 0)
            .unwrap();
        let totals = s.session_totals("sess").unwrap();
        assert_eq!(totals.message_count, 1);
        assert_eq!(totals.unsummarized_tokens, 100);
        assert_eq!(totals.tokens(), 100);
    }
}
