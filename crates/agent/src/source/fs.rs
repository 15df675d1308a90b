//! Fs — filesystem-backed source provider.

use std::io::SeekFrom;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::warn;

use super::{LineRead, SourceError, SourceFile, SourceProvider};

/// Flat-directory source provider: every regular file directly under the
/// root is a candidate source, identified by its file name.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceProvider for FsSource {
    async fn list_available(&self) -> Result<Vec<SourceFile>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| SourceError::Enumerate(format!("{}: {}", self.root.display(), e)))?;

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(SourceError::Enumerate(format!("{}: {}", self.root.display(), e)))
                }
            };
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    // The file may have vanished between readdir and stat.
                    warn!("Skipping source {:?}: metadata unavailable ({})", entry.file_name(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                warn!("Skipping source with non-UTF-8 name: {:?}", entry.file_name());
                continue;
            };
            files.push(SourceFile { name, len: metadata.len() });
        }
        // Deterministic cycle order; no cross-file ordering is guaranteed
        // downstream, this just keeps logs stable.
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn open_from(&self, name: &str, offset: u64) -> Result<Box<dyn LineRead>, SourceError> {
        if name.contains('/') || name.contains("..") {
            return Err(SourceError::Open(name.to_string(), "invalid source name".to_string()));
        }
        let path = self.root.join(name);
        let mut file = File::open(&path)
            .await
            .map_err(|e| SourceError::Open(name.to_string(), e.to_string()))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| SourceError::Open(name.to_string(), e.to_string()))?;
        Ok(Box::new(FsLineReader {
            name: name.to_string(),
            reader: BufReader::new(file),
            pos: offset,
            buf: Vec::with_capacity(4096),
        }))
    }
}

struct FsLineReader {
    name: String,
    reader: BufReader<File>,
    /// Byte position just past the last consumed (terminated) line.
    pos: u64,
    buf: Vec<u8>,
}

#[async_trait]
impl LineRead for FsLineReader {
    async fn next_line(&mut self) -> Result<Option<Bytes>, SourceError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|e| SourceError::Read(self.name.clone(), e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() != Some(&b'\n') {
            // Unterminated tail: a writer is likely mid-append. Leave it
            // unconsumed so the next cycle picks the whole line up intact.
            return Ok(None);
        }
        self.pos += n as u64;

        let mut end = self.buf.len() - 1;
        if end > 0 && self.buf[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(Some(Bytes::copy_from_slice(&self.buf[..end])))
    }

    fn position(&self) -> u64 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_source(dir: &tempfile::TempDir, name: &str, content: &str) {
        tokio::fs::write(dir.path().join(name), content).await.unwrap();
    }

    // ── list_available ──────────────────────────────────────────

    #[tokio::test]
    async fn test_list_reports_names_and_lengths() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "b.log", "hello\n").await;
        write_source(&dir, "a.log", "hi\n").await;

        let source = FsSource::new(dir.path());
        let files = source.list_available().await.unwrap();
        assert_eq!(
            files,
            vec![
                SourceFile { name: "a.log".to_string(), len: 3 },
                SourceFile { name: "b.log".to_string(), len: 6 },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "a.log", "x\n").await;
        tokio::fs::create_dir(dir.path().join("subdir")).await.unwrap();

        let source = FsSource::new(dir.path());
        let files = source.list_available().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.log");
    }

    #[tokio::test]
    async fn test_list_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(dir.path().join("nope"));
        assert!(matches!(
            source.list_available().await,
            Err(SourceError::Enumerate(_))
        ));
    }

    // ── open_from / next_line ───────────────────────────────────

    #[tokio::test]
    async fn test_reads_lines_and_tracks_position() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "a.log", "one\ntwo\n").await;

        let source = FsSource::new(dir.path());
        let mut reader = source.open_from("a.log", 0).await.unwrap();

        assert_eq!(reader.next_line().await.unwrap().unwrap(), Bytes::from("one"));
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.next_line().await.unwrap().unwrap(), Bytes::from("two"));
        assert_eq!(reader.position(), 8);
        assert!(reader.next_line().await.unwrap().is_none());
        assert_eq!(reader.position(), 8);
    }

    #[tokio::test]
    async fn test_open_at_offset_skips_consumed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "a.log", "one\ntwo\n").await;

        let source = FsSource::new(dir.path());
        let mut reader = source.open_from("a.log", 4).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().unwrap(), Bytes::from("two"));
        assert_eq!(reader.position(), 8);
    }

    #[tokio::test]
    async fn test_crlf_terminators_are_stripped_but_counted() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "a.log", "one\r\ntwo\r\n").await;

        let source = FsSource::new(dir.path());
        let mut reader = source.open_from("a.log", 0).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().unwrap(), Bytes::from("one"));
        assert_eq!(reader.position(), 5);
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_held_back() {
        let dir = tempfile::tempdir().unwrap();
        write_source(&dir, "a.log", "done\npart").await;

        let source = FsSource::new(dir.path());
        let mut reader = source.open_from("a.log", 0).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().unwrap(), Bytes::from("done"));
        // "part" has no terminator yet; not consumed.
        assert!(reader.next_line().await.unwrap().is_none());
        assert_eq!(reader.position(), 5);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(dir.path());
        assert!(matches!(
            source.open_from("ghost.log", 0).await,
            Err(SourceError::Open(_, _))
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(dir.path());
        assert!(source.open_from("../etc/passwd", 0).await.is_err());
    }
}
