//! Backup module — append-only destination sink for sanitized output.

pub mod fs;

use async_trait::async_trait;
use thiserror::Error;

pub use fs::FsSink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to append to backup {0}: {1}")]
    Append(String, String),
}

#[async_trait]
pub trait DestinationSink: Send + Sync {
    /// Append `content` to the named backup artifact, creating it on first
    /// use. Raises on durable I/O failure — never a silent no-op.
    async fn append(&self, destination: &str, content: &[u8]) -> Result<(), SinkError>;
}
