//! # lcm-inject
//!
//! The post-host-compaction reconstruction block (§4.F): after the host
//! drops its own conversation context, this renders every current
//! top-level summary, prefixed with its stable id and covered
//! transcript-offset range, into the exact wire format from §6 — every
//! current root of the summary DAG, joined with a fixed preamble, in
//! transcript order.

use lcm_store::Store;

const PREAMBLE: &str = "Prior conversation summarized below. Use expand/S<id> to retrieve details.";
const MENU: &str = "Verbs: expand S<id>, grep \"…\", describe <id>";

/// Render the reconstruction block for `session_id`. Empty (an empty
/// string) if the session has no summaries yet (§4.F "must be a no-op if
/// no summaries exist").
pub fn render(store: &Store, session_id: &str) -> lcm_store::Result<String> {
    let summaries = store.top_level_summaries(session_id)?;
    if summaries.is_empty() {
        return Ok(String::new());
    }

    let mut lines = Vec::with_capacity(summaries.len() + 3);
    lines.push("<lcm-context>".to_string());
    lines.push(PREAMBLE.to_string());
    for s in &summaries {
        lines.push(format!(
            "[S{}  msgs {}\u{2013}{}]    {}",
            s.id, s.covered_start, s.covered_end, s.content
        ));
    }
    lines.push(MENU.to_string());
    lines.push("</lcm-context>".to_string());
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcm_core::{Child, Role, SummaryKind};

    #[test]
    fn empty_session_produces_an_empty_block() {
        let store = Store::open_in_memory().unwrap();
        store.init_session("sess").unwrap();
        assert_eq!(render(&store, "sess").unwrap(), "");
    }

    #[test]
    fn renders_top_level_summaries_in_transcript_order() {
        let store = Store::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 1..=3 {
            let m = store
                .append_message("sess", Role::User, &format!("message {i}"), i)
                .unwrap();
            ids.push(m.id);
        }
        let leaf_a = store
            .insert_summary(
                "sess",
                0,
                SummaryKind::BulletPoints,
                "did the first thing",
                10,
                &[Child::Message(ids[0])],
            )
            .unwrap();
        let leaf_b = store
            .insert_summary(
                "sess",
                0,
                SummaryKind::BulletPoints,
                "did the second thing",
                10,
                &[Child::Message(ids[1]), Child::Message(ids[2])],
            )
            .unwrap();

        let block = render(&store, "sess").unwrap();
        assert!(block.starts_with("<lcm-context>"));
        assert!(block.ends_with("</lcm-context>"));
        assert!(block.contains(&format!("[S{}  msgs 1\u{2013}1]    did the first thing", leaf_a.id)));
        assert!(block.contains(&format!("[S{}  msgs 2\u{2013}3]    did the second thing", leaf_b.id)));
        assert!(block.find("did the first thing").unwrap() < block.find("did the second thing").unwrap());
        assert!(block.contains("expand S<id>"));
    }

    #[test]
    fn condensed_summaries_hide_the_leaves_they_cover() {
        let store = Store::open_in_memory().unwrap();
        let m = store.append_message("sess", Role::User, "hi", 0).unwrap();
        let leaf = store
            .insert_summary(
                "sess",
                0,
                SummaryKind::Truncated,
                "leaf text",
                5,
                &[Child::Message(m.id)],
            )
            .unwrap();
        store
            .insert_summary(
                "sess",
                1,
                SummaryKind::Truncated,
                "condensed text",
                5,
                &[Child::Summary(leaf.id)],
            )
            .unwrap();

        let block = render(&store, "sess").unwrap();
        assert!(block.contains("condensed text"));
        assert!(!block.contains("leaf text"));
    }
}
