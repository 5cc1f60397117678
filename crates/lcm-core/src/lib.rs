//! # lcm-core
//!
//! Shared data model, identifier grammar, error taxonomy, and
//! configuration for the lossless context-management engine.
//!
//! This crate has no I/O of its own: it defines the types every other
//! crate in the workspace builds on (`lcm-store` persists them,
//! `lcm-capture` produces them, `lcm-compaction` and `lcm-inject` consume
//! them).

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod tokens;

pub use config::Config;
pub use error::{LcmError, Result};
pub use ids::Id;
pub use model::{Child, FileRef, Message, Role, Session, Summary, SummaryKind};
