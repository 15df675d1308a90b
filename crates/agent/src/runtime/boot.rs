//! Boot — logging init, config load, checkpoint recovery, state creation.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::backup::FsSink;
use crate::checkpoint::CheckpointStore;
use crate::conf::AgentConfig;
use crate::pipeline::Orchestrator;
use crate::source::FsSource;
use crate::state::{AgentState, SharedState};

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, prepare directories, recover the checkpoint table, and
/// build the shared state plus the filesystem-backed orchestrator.
///
/// Returns `(SharedState, Orchestrator)` on success.
pub async fn boot() -> Result<(SharedState, Orchestrator), Box<dyn std::error::Error>> {
    info!("Starting Logvault Agent v0.1.0");

    let config = AgentConfig::load()?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!("Source directory: {}", config.source_dir);
    info!("Backup directory: {}", config.backup_dir);
    info!(
        "Cycle interval: {}s, max concurrent files: {}",
        config.cycle_interval_secs, config.max_concurrent_files
    );
    info!(
        "Masking: {} full-mask, {} partial-mask, {} skip-record, {} skip-field rule(s)",
        config.masking.full_mask.len(),
        config.masking.partial_mask.len(),
        config.masking.skip_if_contains.len(),
        config.masking.skip_fields.len()
    );

    if !Path::new(&config.source_dir).exists() {
        warn!(
            "Source directory {} does not exist yet; cycles stay empty until it appears",
            config.source_dir
        );
    }
    tokio::fs::create_dir_all(&config.backup_dir).await.map_err(|e| {
        error!("Failed to create backup directory {}: {}", config.backup_dir, e);
        e
    })?;
    if let Some(parent) = Path::new(&config.checkpoint_path).parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            error!("Failed to create checkpoint directory {}: {}", parent.display(), e);
            e
        })?;
    }

    let checkpoints = Arc::new(CheckpointStore::load(&config.checkpoint_path).await);
    let state = Arc::new(AgentState::new(config.clone(), checkpoints));
    info!("Initialized shared application state");

    let source = Arc::new(FsSource::new(&config.source_dir));
    let sink = Arc::new(FsSink::new(&config.backup_dir));
    let orchestrator = Orchestrator::new(Arc::clone(&state), source, sink);

    Ok((state, orchestrator))
}
