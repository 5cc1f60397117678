//! Error taxonomy for LCM.
//!
//! A single enum covering the kinds named in the error handling design:
//! `StoreUnavailable`, `TranscriptUnreadable`, `LLMUnavailable`,
//! `InvariantViolation`, `InputError`. Crate-local error enums (in
//! `lcm-store`, `lcm-capture`, `lcm-compaction`, ...) implement
//! `From<_> for LcmError` at the boundary where they cross into `lcm-cli`.

use thiserror::Error;

/// Result type alias using [`LcmError`].
pub type Result<T> = std::result::Result<T, LcmError>;

/// Top-level error taxonomy shared across the workspace.
#[derive(Error, Debug)]
pub enum LcmError {
    /// The database cannot be opened or is corrupted. Fatal.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The host transcript file is missing or malformed. Capture degrades
    /// to a no-op rather than propagating this further.
    #[error("transcript unreadable: {0}")]
    TranscriptUnreadable(String),

    /// The LLM API failed after retries were exhausted.
    #[error("LLM unavailable: {0}")]
    LLMUnavailable(String),

    /// A store read revealed a state that should be impossible.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed id, invalid query, or other caller-local input error.
    #[error("input error: {0}")]
    InputError(String),
}

impl LcmError {
    /// The process exit code this error kind maps to (§6 External
    /// Interfaces). `TranscriptUnreadable` maps to 0 because capture
    /// degrades silently rather than failing the hook.
    pub fn exit_code(&self) -> i32 {
        match self {
            LcmError::StoreUnavailable(_) => 3,
            LcmError::LLMUnavailable(_) => 4,
            LcmError::TranscriptUnreadable(_) => 0,
            LcmError::InvariantViolation(_) => 3,
            LcmError::InputError(_) => 2,
        }
    }
}
