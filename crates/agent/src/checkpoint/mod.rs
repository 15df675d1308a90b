//! Checkpoint module — persisted per-source backup progress.

pub mod store;

pub use store::{CheckpointError, CheckpointRecord, CheckpointStore};
