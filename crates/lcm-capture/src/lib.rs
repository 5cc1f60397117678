//! # lcm-capture
//!
//! The transcript-diff capture protocol (§4.E): reads the host's
//! transcript file line-by-line (`BufReader::lines()`), diffs it against
//! how many valid records this session has already captured, and appends
//! the rest as new messages in a gap-free, reentrant sequence starting
//! at 1 — against a file this process does not own and that mutates
//! externally.

mod error;
mod record;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use lcm_core::config::CaptureConfig;
use lcm_store::Store;

pub use error::{CaptureError, Result};
pub use record::{NormalizedRecord, RawTranscriptRecord};

/// Outcome of one capture pass, surfaced for diagnostics (`doctor`-style
/// output, logging) but not required by the protocol itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    pub records_appended: usize,
    pub records_skipped_blank: usize,
    pub files_diverted: usize,
}

/// Read `transcript_path` from `store`'s last-known offset for
/// `session_id` onward, normalize each new line into a message, and
/// append it. Safe to call concurrently with itself on the same session
/// (§4.E reentrancy: `(session_id, transcript_offset)` uniqueness makes
/// a duplicate a silent no-op via [`Store::append_message`]).
pub fn capture_transcript(
    store: &Store,
    config: &CaptureConfig,
    session_id: &str,
    transcript_path: &Path,
) -> Result<CaptureReport> {
    store.init_session(session_id)?;

    let file = File::open(transcript_path).map_err(|e| {
        CaptureError::TranscriptUnreadable(format!("{}: {e}", transcript_path.display()))
    })?;
    let reader = BufReader::new(file);

    // `transcript_offset` is assigned from a counter over *stored*
    // records, not raw file line position, so a blank or malformed line
    // never opens a permanent gap (§8 invariant 5: gap-free from 1). The
    // file is re-read from the start each pass; `already_stored` lets us
    // skip exactly the valid records captured by a prior pass, however
    // many blank/malformed lines separate them in the file.
    let already_stored = store.next_transcript_offset(session_id)? - 1;
    let mut seen_valid: i64 = 0;
    let mut next_offset = already_stored + 1;
    let mut report = CaptureReport::default();

    for line in reader.lines() {
        let line = line.map_err(|e| CaptureError::TranscriptUnreadable(e.to_string()))?;
        if line.trim().is_empty() {
            report.records_skipped_blank += 1;
            continue;
        }

        let raw: RawTranscriptRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(session_id, error = %e, "skipping malformed transcript line");
                continue;
            }
        };
        seen_valid += 1;
        if seen_valid <= already_stored {
            continue;
        }
        let NormalizedRecord { role, content, path } = raw.normalize();
        let diverts = content.len() as u64 >= config.blob_divert_bytes && path.is_some();

        let (final_content, divert_info) = if diverts {
            let path = path.as_deref().unwrap();
            let hash = sha256_hex(content.as_bytes());
            let embedded = reserve_file_reference(store, config, session_id, path, &hash, &content)?;
            report.files_diverted += 1;
            (embedded, Some((path.to_string(), hash, content.len() as i64)))
        } else {
            (content, None)
        };

        let offset = next_offset;
        let msg = store.append_message(session_id, role, &final_content, offset)?;
        if let Some((path, hash, size)) = divert_info {
            store.upsert_file(session_id, &path, &hash, size, msg.id, None)?;
        }
        next_offset += 1;
        report.records_appended += 1;
        debug!(session_id, offset, "captured transcript record");
    }

    Ok(report)
}

/// Reserve (find-or-create) the file reference for a diverted blob
/// before the message that will name it exists (`message_id = 0`
/// sentinel), and return the message content §4.E specifies: `"F" + id`
/// plus a short snippet. The caller patches `first_seen`/
/// `last_seen_message_id` to the real message id right after inserting
/// it (see [`Store::upsert_file`]'s sentinel handling).
fn reserve_file_reference(
    store: &Store,
    config: &CaptureConfig,
    session_id: &str,
    path: &str,
    hash: &str,
    content: &str,
) -> Result<String> {
    let snippet: String = content.chars().take(config.snippet_len_bytes).collect();
    let file_ref = store.upsert_file(
        session_id,
        path,
        hash,
        content.len() as i64,
        0,
        Some(&snippet),
    )?;
    Ok(format!("F{}\n{snippet}", file_ref.id))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use lcm_core::Role;

    use super::*;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    #[test]
    fn appends_new_records_in_order() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let transcript = write_lines(&[
            r#"{"role":"user","content":"hi"}"#,
            r#"{"role":"assistant","content":"hello"}"#,
        ]);

        let report =
            capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        assert_eq!(report.records_appended, 2);

        let msgs = store.unsummarized_messages("sess").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "hi");
        assert_eq!(msgs[0].transcript_offset, 1);
        assert_eq!(msgs[1].transcript_offset, 2);
    }

    #[test]
    fn second_capture_only_appends_new_lines() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let transcript = write_lines(&[r#"{"role":"user","content":"hi"}"#]);

        capture_transcript(&store, &config, "sess", transcript.path()).unwrap();

        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(transcript.path())
            .unwrap();
        writeln!(f, r#"{{"role":"assistant","content":"hello"}}"#).unwrap();

        let report =
            capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        assert_eq!(report.records_appended, 1);
        assert_eq!(store.unsummarized_messages("sess").unwrap().len(), 2);
    }

    #[test]
    fn rerunning_without_new_bytes_is_a_noop() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let transcript = write_lines(&[r#"{"role":"user","content":"hi"}"#]);

        capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        let report =
            capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        assert_eq!(report.records_appended, 0);
        assert_eq!(store.unsummarized_messages("sess").unwrap().len(), 1);
    }

    #[test]
    fn missing_transcript_degrades_to_transcript_unreadable() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let err = capture_transcript(
            &store,
            &config,
            "sess",
            Path::new("/nonexistent/path/transcript.jsonl"),
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::TranscriptUnreadable(_)));
    }

    #[test]
    fn tool_use_record_is_flattened_into_content() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let transcript = write_lines(&[
            r#"{"role":"tool_use","tool_name":"Write","tool_input":{"path":"a.rs"},"content":"wrote"}"#,
        ]);
        capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        let msgs = store.unsummarized_messages("sess").unwrap();
        assert_eq!(msgs[0].role, Role::ToolUse);
        assert!(msgs[0].content.starts_with("[tool_use:Write]"));
    }

    #[test]
    fn large_blob_with_a_path_is_diverted_to_a_file_reference() {
        let store = Store::open_in_memory().unwrap();
        let mut config = CaptureConfig::default();
        config.blob_divert_bytes = 32;
        let big = "x".repeat(100);
        let line = serde_json::json!({
            "role": "tool_result",
            "status": "ok",
            "content": big,
            "path": "src/big.rs",
        })
        .to_string();
        let transcript = write_lines(&[&line]);

        let report =
            capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        assert_eq!(report.files_diverted, 1);

        let msgs = store.unsummarized_messages("sess").unwrap();
        assert!(msgs[0].content.starts_with('F'));
        let file_id: i64 = msgs[0].content.lines().next().unwrap()[1..].parse().unwrap();
        let file_ref = store.get_file(file_id).unwrap();
        assert_eq!(file_ref.path, "src/big.rs");
        assert_eq!(file_ref.first_seen_message_id, msgs[0].id);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let store = Store::open_in_memory().unwrap();
        let config = CaptureConfig::default();
        let transcript = write_lines(&[
            r#"{"role":"user","content":"hi"}"#,
            "",
            r#"{"role":"assistant","content":"hello"}"#,
        ]);
        let report =
            capture_transcript(&store, &config, "sess", transcript.path()).unwrap();
        assert_eq!(report.records_appended, 2);
        assert_eq!(report.records_skipped_blank, 1);

        let msgs = store.unsummarized_messages("sess").unwrap();
        let offsets: Vec<i64> = msgs.iter().map(|m| m.transcript_offset).collect();
        assert_eq!(offsets, vec![1, 2], "stored offsets must stay gap-free from 1");
    }
}
