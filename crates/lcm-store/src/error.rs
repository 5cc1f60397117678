//! Store-local error type, funneled into [`lcm_core::LcmError`] at the
//! boundary where it crosses into another crate (§7).

use thiserror::Error;

use lcm_core::LcmError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("input error: {0}")]
    Input(String),
}

impl From<StoreError> for LcmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => LcmError::StoreUnavailable(e.to_string()),
            StoreError::Unavailable(msg) => LcmError::StoreUnavailable(msg),
            StoreError::Invariant(msg) => LcmError::InvariantViolation(msg),
            StoreError::NotFound(msg) => LcmError::InputError(msg),
            StoreError::Input(msg) => LcmError::InputError(msg),
        }
    }
}
