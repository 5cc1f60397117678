//! # lcm-cli
//!
//! The `lcm` binary: the hook surface the host invokes per turn
//! (`init`, `capture`, `inject`) and the retrieval tools an agent calls
//! directly (`status`, `grep`, `describe`, `expand`) — §6 External
//! Interfaces.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lcm_compaction::CompactionEngine;
use lcm_core::{Config, LcmError};
use lcm_llm::{AnthropicLlmClient, RetryPolicy};
use lcm_store::Store;

mod doctor;
mod hooks;
mod retrieval;

/// LCM — lossless context management engine sidecar.
#[derive(Parser)]
#[command(name = "lcm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ensure the session row and schema exist. Reads hook JSON from
    /// stdin; no-op if already initialized.
    Init,
    /// Diff the host transcript into the store and react to token
    /// pressure. Reads hook JSON from stdin.
    Capture,
    /// Emit the post-compaction reconstruction block on stdout. Reads
    /// hook JSON from stdin; prints nothing if there's nothing to inject.
    Inject,
    /// Message count, summary counts by level, token totals, DAG depth.
    Status {
        /// Session id.
        session: String,
    },
    /// Metadata for any id: a bare integer (message), `S<n>` (summary),
    /// or `F<n>` (file reference).
    Describe {
        /// The id to describe.
        id: String,
    },
    /// The ordered immediate children of a summary, with previews.
    Expand {
        /// The summary id, `S<n>`.
        id: String,
    },
    /// Search messages and/or summaries.
    Grep {
        /// Session id.
        session: String,
        /// Query text (a phrase for `fts`, a pattern for `regex`).
        query: String,
        /// Search mode.
        #[arg(long, default_value = "fts")]
        mode: String,
        /// What to search.
        #[arg(long, default_value = "both")]
        scope: String,
        /// Opaque page token from a previous page's `next_page`.
        #[arg(long)]
        page: Option<String>,
    },
    /// Check installation health: store, config, LLM credentials.
    Doctor,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LCM_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load configuration; using defaults");
            Config::default()
        }
    }
}

fn open_store(config: &Config) -> Result<Store, LcmError> {
    if let Some(parent) = config.db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Ok(Store::open(&config.db_path)?)
}

fn build_engine(store: Arc<Store>, config: &Config) -> Arc<CompactionEngine> {
    let retry = RetryPolicy {
        max_attempts: config.llm.max_retries,
        base_delay: Duration::from_millis(config.llm.backoff_base_ms),
        cap_delay: Duration::from_millis(config.llm.backoff_cap_ms),
        call_timeout: Duration::from_secs(config.llm.call_timeout_secs),
    };
    let api_key = config.llm.resolve_api_key().unwrap_or_default();
    let llm = AnthropicLlmClient::new(api_key, config.llm.model.clone()).with_retry_policy(retry);
    CompactionEngine::new(store, Arc::new(llm), config.clone())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config();

    let result = run(cli.command, &config).await;
    match result {
        Ok(Some(output)) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "lcm command failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Hook wall clock for capture/inject (§5): 10 s, after which the hook is
/// abandoned rather than blocking the host.
const HOOK_TIMEOUT: Duration = Duration::from_secs(10);
/// Hook wall clock for compact (§5): capture's own 30 s budget, since a
/// capture that crosses τ_hard runs compaction synchronously in its body.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Race `fut` against `duration`. On expiry the hook is abandoned (§5:
/// "store state is consistent by construction") rather than failing —
/// any partial write rolls back with the transaction that held it.
async fn abandon_on_timeout<T, F>(duration: Duration, label: &str, fut: F) -> Result<Option<T>, LcmError>
where
    F: std::future::Future<Output = Result<T, LcmError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result.map(Some),
        Err(_) => {
            tracing::warn!(label, seconds = duration.as_secs(), "hook exceeded its wall clock; abandoned");
            Ok(None)
        }
    }
}

/// Dispatch one subcommand. Returns `Ok(Some(text))` when the command
/// has stdout output beyond a bare success, `Ok(None)` otherwise.
async fn run(command: Command, config: &Config) -> Result<Option<String>, LcmError> {
    match command {
        Command::Init => {
            abandon_on_timeout(HOOK_TIMEOUT, "init", async {
                let store = open_store(config)?;
                let input = hooks::HookInput::read_stdin()?;
                let session_id = input.session_id()?;
                hooks::init(&store, &session_id)
            })
            .await?;
            Ok(None)
        }
        Command::Capture => {
            abandon_on_timeout(CAPTURE_TIMEOUT, "capture", async {
                let store = open_store(config)?;
                let input = hooks::HookInput::read_stdin()?;
                let session_id = input.session_id()?;
                let store = Arc::new(store);
                let engine = build_engine(store.clone(), config);
                hooks::capture(
                    &store,
                    &engine,
                    &config.capture,
                    &session_id,
                    input.transcript_path.as_deref(),
                )
                .await
            })
            .await?;
            Ok(None)
        }
        Command::Inject => {
            let block = abandon_on_timeout(HOOK_TIMEOUT, "inject", async {
                let store = open_store(config)?;
                let input = hooks::HookInput::read_stdin()?;
                let session_id = input.session_id()?;
                hooks::inject(&store, &session_id)
            })
            .await?;
            Ok(block.filter(|b| !b.is_empty()))
        }
        Command::Status { session } => {
            let store = open_store(config)?;
            let report = retrieval::status(&store, &session)?;
            Ok(Some(serde_json::to_string_pretty(&report).unwrap()))
        }
        Command::Describe { id } => {
            let store = open_store(config)?;
            let report = retrieval::describe(&store, &id)?;
            Ok(Some(serde_json::to_string_pretty(&report).unwrap()))
        }
        Command::Expand { id } => {
            let store = open_store(config)?;
            let report = retrieval::expand(&store, &id)?;
            Ok(Some(serde_json::to_string_pretty(&report).unwrap()))
        }
        Command::Grep {
            session,
            query,
            mode,
            scope,
            page,
        } => {
            let store = open_store(config)?;
            let mode = retrieval::parse_mode(&mode)?;
            let scope = retrieval::parse_scope(&scope)?;
            let report = retrieval::grep(&store, &session, &query, mode, scope, page.as_deref())?;
            Ok(Some(serde_json::to_string_pretty(&report).unwrap()))
        }
        Command::Doctor => {
            doctor::run(config).map_err(|e| LcmError::StoreUnavailable(e.to_string()))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_on_an_empty_session_is_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.db_path = dir.path().join("lcm.db");
        let store = open_store(&config).unwrap();
        store.init_session("sess").unwrap();
        let out = retrieval::status(&store, "sess").unwrap();
        assert_eq!(out.message_count, 0);
        assert_eq!(out.unsummarized_tokens, 0);
    }

    #[tokio::test]
    async fn inject_on_an_empty_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.db_path = dir.path().join("lcm.db");
        let store = open_store(&config).unwrap();
        store.init_session("sess").unwrap();
        let block = hooks::inject(&store, "sess").unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn unrecognized_scope_is_an_input_error() {
        let err = retrieval::parse_scope("everything").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_describe_id_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("lcm.db")).unwrap();
        let err = retrieval::describe(&store, "not-an-id").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
