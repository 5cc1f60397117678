//! # lcm-compaction
//!
//! The escalation ladder (§4.C, module [`ladder`]) and the compaction
//! engine (§4.D, module [`engine`]) that together keep a session's
//! unsummarized token pressure under τ_soft/τ_hard by condensing the
//! message log into the summary DAG `lcm-store` persists.

pub mod engine;
pub mod ladder;

pub use engine::CompactionEngine;
pub use ladder::{LadderAborted, LadderResult};
