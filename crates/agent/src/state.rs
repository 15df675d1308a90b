use std::sync::Arc;
use dashmap::DashMap;

use crate::checkpoint::CheckpointStore;
use crate::conf::AgentConfig;
use crate::metrics::BackupMetrics;

/// Per-source processing status, refreshed after every file pass.
/// Kept for operator-facing cycle logs; the checkpoint table remains the
/// single source of truth for resumption.
#[derive(Debug, Clone)]
pub struct SourceActivity {
    pub destination: String,
    pub offset: u64,
    pub lines_written: u64,
    pub lines_dropped: u64,
    pub last_error: Option<String>,
}

impl SourceActivity {
    pub fn new(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
            offset: 0,
            lines_written: 0,
            lines_dropped: 0,
            last_error: None,
        }
    }
}

pub struct AgentState {
    pub config: AgentConfig,
    pub checkpoints: Arc<CheckpointStore>,
    pub metrics: Arc<BackupMetrics>,
    /// Live per-source activity cache, keyed by source file name.
    pub activity: DashMap<String, SourceActivity>,
}

impl AgentState {
    pub fn new(config: AgentConfig, checkpoints: Arc<CheckpointStore>) -> Self {
        Self {
            config,
            checkpoints,
            metrics: Arc::new(BackupMetrics::new()),
            activity: DashMap::new(),
        }
    }
}

pub type SharedState = Arc<AgentState>;
