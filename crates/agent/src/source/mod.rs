//! Source module — enumeration and offset-positioned reads of live log files.
//!
//! The provider contract is the only thing the pipeline knows about sources:
//! a per-cycle snapshot of `{name, length}` descriptors, and a line reader
//! opened at a byte offset that tolerates a writer appending concurrently.

pub mod fs;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use fs::FsSource;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source enumeration failed: {0}")]
    Enumerate(String),
    #[error("Failed to open source {0}: {1}")]
    Open(String, String),
    #[error("Read failed on source {0}: {1}")]
    Read(String, String),
}

/// Ephemeral descriptor of one candidate source file. Re-derived from live
/// enumeration every cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub len: u64,
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Snapshot of the currently visible source files.
    async fn list_available(&self) -> Result<Vec<SourceFile>, SourceError>;

    /// Open a source for shared reading, positioned at `offset`.
    async fn open_from(&self, name: &str, offset: u64) -> Result<Box<dyn LineRead>, SourceError>;
}

#[async_trait]
pub trait LineRead: Send {
    /// Next complete line with its terminator stripped, or `None` at end of
    /// stream. Only lines actually terminated in the underlying stream are
    /// consumed; an unterminated trailing chunk is left for a later read.
    async fn next_line(&mut self) -> Result<Option<Bytes>, SourceError>;

    /// Byte position just past the last consumed line.
    fn position(&self) -> u64;
}
