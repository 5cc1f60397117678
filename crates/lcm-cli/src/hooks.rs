//! The hook surface (§6): `init`, `capture`, `inject`. Each reads
//! `{session_id, transcript_path, event}` JSON from stdin (§6), with
//! `CLAUDE_SESSION_ID` as the fallback for a missing `session_id` and
//! `transcript_path` required only by `capture`.
//!
//! Propagation policy (§7): capture and inject swallow every non-fatal
//! error so the host's turn is never blocked by the augmentation layer —
//! only `StoreUnavailable`/`InvariantViolation` escape as hard failures.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use lcm_compaction::CompactionEngine;
use lcm_core::LcmError;
use lcm_store::Store;

/// The stdin payload every hook receives (§6). `event` is accepted but
/// not interpreted — hosts may extend it; LCM's hooks only need the
/// session and transcript location.
#[derive(Debug, Deserialize, Default)]
pub struct HookInput {
    pub session_id: Option<String>,
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub event: serde_json::Value,
}

impl HookInput {
    pub fn read_stdin() -> Result<Self, LcmError> {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| LcmError::InputError(format!("failed to read stdin: {e}")))?;
        if buf.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&buf)
            .map_err(|e| LcmError::InputError(format!("malformed hook input: {e}")))
    }

    /// Resolve the session id, falling back to `CLAUDE_SESSION_ID` (§6).
    pub fn session_id(&self) -> Result<String, LcmError> {
        self.session_id
            .clone()
            .or_else(|| std::env::var("CLAUDE_SESSION_ID").ok())
            .ok_or_else(|| LcmError::InputError("no session_id on stdin or CLAUDE_SESSION_ID".to_string()))
    }
}

/// `init`: ensure the session row and schema exist; no-op if already
/// initialized (§6).
pub fn init(store: &Store, session_id: &str) -> Result<(), LcmError> {
    store.init_session(session_id)?;
    Ok(())
}

/// `capture`: idempotently diff the transcript in, then let the
/// compaction engine react to the resulting token pressure (§4.D
/// `on_capture`, §4.E). A missing or malformed transcript degrades to a
/// no-op (`TranscriptUnreadable`, exit 0) rather than failing the hook.
pub async fn capture(
    store: &Store,
    engine: &Arc<CompactionEngine>,
    config: &lcm_core::config::CaptureConfig,
    session_id: &str,
    transcript_path: Option<&str>,
) -> Result<(), LcmError> {
    let Some(path) = transcript_path else {
        warn!(session_id, "capture invoked with no transcript_path; nothing to do");
        return Ok(());
    };
    match lcm_capture::capture_transcript(store, config, session_id, &PathBuf::from(path)) {
        Ok(report) => {
            tracing::info!(
                session_id,
                appended = report.records_appended,
                diverted = report.files_diverted,
                "captured transcript"
            );
        }
        Err(lcm_capture::CaptureError::TranscriptUnreadable(msg)) => {
            warn!(session_id, error = %msg, "transcript unreadable; capture degraded to no-op");
            return Ok(());
        }
        Err(lcm_capture::CaptureError::Store(e)) => return Err(e.into()),
    }

    if let Err(e) = engine.on_capture(session_id).await {
        let mapped: LcmError = e.into();
        match mapped {
            LcmError::StoreUnavailable(_) | LcmError::InvariantViolation(_) => return Err(mapped),
            other => warn!(session_id, error = %other, "compaction pass failed during capture"),
        }
    }
    Ok(())
}

/// `inject`: render the reconstruction block to stdout; empty string if
/// there is nothing to inject (§4.F).
pub fn inject(store: &Store, session_id: &str) -> Result<String, LcmError> {
    Ok(lcm_inject::render(store, session_id)?)
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use lcm_core::Config;
    use lcm_llm::StubLlmClient;

    use super::*;

    /// `CLAUDE_SESSION_ID` is process-wide state; serialize the handful of
    /// tests that touch it so they don't race each other.
    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn explicit_session_id_wins_over_env() {
        let _guard = env_lock().lock().unwrap();
        std::env::set_var("CLAUDE_SESSION_ID", "env-session");
        let input = HookInput {
            session_id: Some("explicit-session".to_string()),
            ..Default::default()
        };
        assert_eq!(input.session_id().unwrap(), "explicit-session");
        std::env::remove_var("CLAUDE_SESSION_ID");
    }

    #[test]
    fn falls_back_to_env_var_when_stdin_omits_it() {
        let _guard = env_lock().lock().unwrap();
        std::env::set_var("CLAUDE_SESSION_ID", "env-session");
        let input = HookInput::default();
        assert_eq!(input.session_id().unwrap(), "env-session");
        std::env::remove_var("CLAUDE_SESSION_ID");
    }

    #[test]
    fn missing_session_id_everywhere_is_an_input_error() {
        let _guard = env_lock().lock().unwrap();
        std::env::remove_var("CLAUDE_SESSION_ID");
        let err = HookInput::default().session_id().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn capture_with_no_transcript_path_is_a_noop() {
        let store = std::sync::Arc::new(Store::open_in_memory().unwrap());
        let engine = CompactionEngine::new(
            store.clone(),
            std::sync::Arc::new(StubLlmClient::new()),
            Config::default(),
        );
        capture(&store, &engine, &Config::default().capture, "sess", None)
            .await
            .unwrap();
        assert!(store.unsummarized_messages("sess").unwrap().is_empty());
    }
}
