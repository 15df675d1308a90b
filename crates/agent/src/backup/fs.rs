//! Fs — filesystem-backed destination sink.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{DestinationSink, SinkError};

pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DestinationSink for FsSink {
    async fn append(&self, destination: &str, content: &[u8]) -> Result<(), SinkError> {
        if destination.contains('/') || destination.contains("..") {
            return Err(SinkError::Append(
                destination.to_string(),
                "invalid destination name".to_string(),
            ));
        }
        let path = self.root.join(destination);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::Append(destination.to_string(), e.to_string()))?;
        file.write_all(content)
            .await
            .map_err(|e| SinkError::Append(destination.to_string(), e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| SinkError::Append(destination.to_string(), e.to_string()))?;
        Ok(())
    }
}
