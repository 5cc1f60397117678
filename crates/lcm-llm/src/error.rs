//! LLM client error type, funneled into [`lcm_core::LcmError`] at the
//! boundary (§7: all LLM failures surface as a single `LLMUnavailable`
//! kind once retries are exhausted).

use thiserror::Error;

use lcm_core::LcmError;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    Input(String),
}

impl From<LlmError> for LcmError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable(msg) => LcmError::LLMUnavailable(msg),
            LlmError::Input(msg) => LcmError::InputError(msg),
        }
    }
}
