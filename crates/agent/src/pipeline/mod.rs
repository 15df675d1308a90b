//! Pipeline module — per-file incremental processing and the per-cycle
//! multi-file orchestration around it.

pub mod file;
pub mod orchestrator;

use std::sync::Arc;

use thiserror::Error;

use crate::backup::{DestinationSink, SinkError};
use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::mask::MaskEngine;
use crate::metrics::BackupMetrics;
use crate::source::{SourceError, SourceProvider};

pub use orchestrator::{CycleSummary, Orchestrator};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Backup error: {0}")]
    Sink(#[from] SinkError),
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Everything a file pass needs, cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct PipelineContext {
    pub source: Arc<dyn SourceProvider>,
    pub sink: Arc<dyn DestinationSink>,
    pub checkpoints: Arc<CheckpointStore>,
    pub engine: Arc<MaskEngine>,
    pub metrics: Arc<BackupMetrics>,
}

/// Result of one successful file pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub destination: String,
    pub new_offset: u64,
    pub lines_written: u64,
    pub lines_dropped: u64,
}
