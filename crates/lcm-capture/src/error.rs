//! Capture-local error type, funneled into [`lcm_core::LcmError`] at the
//! boundary (§7: a missing or malformed transcript degrades capture to a
//! no-op rather than propagating further).

use thiserror::Error;

use lcm_core::LcmError;
use lcm_store::StoreError;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("transcript unreadable: {0}")]
    TranscriptUnreadable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CaptureError> for LcmError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::TranscriptUnreadable(msg) => LcmError::TranscriptUnreadable(msg),
            CaptureError::Store(e) => e.into(),
        }
    }
}
