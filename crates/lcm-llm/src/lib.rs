//! # lcm-llm
//!
//! The abstract summarization/classification LLM client (§4.B): one
//! production backend (`AnthropicLlmClient`) and one deterministic
//! in-memory backend (`StubLlmClient`) for tests, matching the
//! teacher's "real provider + injectable trait" shape.

mod anthropic;
mod error;
mod retry;
mod stub;
mod traits;

pub use anthropic::AnthropicLlmClient;
pub use error::{LlmError, Result};
pub use retry::RetryPolicy;
pub use stub::StubLlmClient;
pub use traits::{LlmClient, ToolSpec};
