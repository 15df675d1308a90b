//! Mask module — the pure line transformation engine.
//!
//! A raw log line goes in; a sanitized line (or a drop decision) comes out.
//! No state, no I/O: the engine is compiled once from config and shared
//! read-only across all file pipelines.

pub mod engine;
pub mod rules;

pub use engine::{DropReason, LineOutcome, MaskEngine};
pub use rules::MaskRules;
