//! Store — the checkpoint table mapping source name → (offset, destination).
//!
//! The persisted table is the single source of truth for resumption. Every
//! mutation rewrites the whole table under one lock (write-then-acknowledge,
//! no write-behind), so the in-memory and on-disk state are identical after
//! each successful mutation.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("No checkpoint exists for source: {0}")]
    NotFound(String),
    #[error("Checkpoint table write failed: {0}")]
    Persist(String),
    #[error("Checkpoint table serialization failed: {0}")]
    Serialize(String),
}

/// Progress record for one source file.
///
/// `destination` is assigned once, on first sighting of the source name,
/// and never changes for the life of that source identity — rotation only
/// resets `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Byte position already consumed from the source.
    pub offset: u64,
    /// Name of the backup artifact this source appends to.
    pub destination: String,
}

pub struct CheckpointStore {
    path: PathBuf,
    table: Mutex<HashMap<String, CheckpointRecord>>,
}

impl CheckpointStore {
    /// Load the whole table from disk. A missing file means a fresh start;
    /// a corrupt file is logged and treated as empty — output is append-only,
    /// so the cost of forgetting progress is visible duplication, not loss.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, CheckpointRecord>>(&bytes) {
                Ok(table) => {
                    info!("Loaded {} checkpoint record(s) from {}", table.len(), path.display());
                    table
                }
                Err(e) => {
                    error!(
                        "Checkpoint table at {} is unreadable ({}); starting empty — all sources will be re-processed from offset 0",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No checkpoint table at {}; starting fresh", path.display());
                HashMap::new()
            }
            Err(e) => {
                error!(
                    "Failed to read checkpoint table at {} ({}); starting empty",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };
        Self {
            path,
            table: Mutex::new(table),
        }
    }

    /// Read-or-create: an absent record is created with offset 0 and a
    /// fresh destination identity, persisted immediately, and returned.
    pub async fn get_or_create(&self, source: &str) -> CheckpointRecord {
        let mut table = self.table.lock().await;
        if let Some(record) = table.get(source) {
            return record.clone();
        }
        let record = CheckpointRecord {
            offset: 0,
            destination: destination_for(source),
        };
        // One destination per source identity, never shared.
        debug_assert!(table.values().all(|r| r.destination != record.destination));
        info!("New source {} -> backup destination {}", source, record.destination);
        table.insert(source.to_string(), record.clone());
        if let Err(e) = self.persist(&table).await {
            error!("Failed to persist new checkpoint for {}: {}", source, e);
        }
        record
    }

    /// Overwrite the offset of an existing record and persist the table.
    ///
    /// Fails with `NotFound` if `get_or_create` was never called for this
    /// source. A persistence failure is logged and swallowed: the in-memory
    /// offset still advances, and the next successful persist repairs the
    /// gap at the cost of re-processing after a crash in between.
    pub async fn save(&self, source: &str, new_offset: u64) -> Result<(), CheckpointError> {
        let mut table = self.table.lock().await;
        let record = table
            .get_mut(source)
            .ok_or_else(|| CheckpointError::NotFound(source.to_string()))?;
        record.offset = new_offset;
        if let Err(e) = self.persist(&table).await {
            warn!(
                "Checkpoint persist failed for {} (offset {} kept in memory, retried on next save): {}",
                source, new_offset, e
            );
        }
        Ok(())
    }

    async fn persist(&self, table: &HashMap<String, CheckpointRecord>) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(table)
            .map_err(|e| CheckpointError::Serialize(e.to_string()))?;
        // Temp file + rename so a crash mid-write never leaves a torn table.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| CheckpointError::Persist(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CheckpointError::Persist(e.to_string()))?;
        Ok(())
    }
}

/// Build a fresh destination identity for a newly sighted source.
///
/// The UTC timestamp prefix (microsecond precision) keeps identities
/// time-ordered for operators; the sanitized source name keeps them
/// collision-free across sources.
fn destination_for(source: &str) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");
    let safe: String = source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.{}.bak", stamp, safe)
}
