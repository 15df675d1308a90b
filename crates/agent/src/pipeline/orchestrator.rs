//! Orchestrator — one cycle over the current source snapshot with bounded
//! concurrency and per-file failure isolation.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::backup::DestinationSink;
use crate::mask::MaskEngine;
use crate::source::SourceProvider;
use crate::state::{SharedState, SourceActivity};

use super::{file, PassSummary, PipelineContext, PipelineError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Files in this cycle's enumeration snapshot.
    pub files: usize,
    /// Files whose pass failed and will be retried next cycle.
    pub failed: usize,
}

pub struct Orchestrator {
    state: SharedState,
    ctx: PipelineContext,
    max_concurrent: usize,
}

impl Orchestrator {
    pub fn new(
        state: SharedState,
        source: Arc<dyn SourceProvider>,
        sink: Arc<dyn DestinationSink>,
    ) -> Self {
        let ctx = PipelineContext {
            source,
            sink,
            checkpoints: Arc::clone(&state.checkpoints),
            engine: Arc::new(MaskEngine::new(&state.config.masking)),
            metrics: Arc::clone(&state.metrics),
        };
        let max_concurrent = state.config.max_concurrent_files;
        Self { state, ctx, max_concurrent }
    }

    /// Run one cycle: snapshot the source set, process each file under the
    /// concurrency bound, isolate every per-file failure. Files appearing
    /// mid-cycle are picked up next cycle; cancellation stops new files
    /// while in-flight ones exit through their loop's natural path.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let files = match self.ctx.source.list_available().await {
            Ok(files) => files,
            Err(e) => {
                error!("Source enumeration failed; skipping this cycle: {}", e);
                return CycleSummary::default();
            }
        };
        let mut summary = CycleSummary { files: files.len(), failed: 0 };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(String, Result<PassSummary, PipelineError>)> = JoinSet::new();

        for file in files {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            self.ctx.metrics.files_seen.fetch_add(1, Ordering::Relaxed);

            let ctx = self.ctx.clone();
            let token = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let name = file.name.clone();
                let result = file::process_file(&ctx, &file, &token).await;
                (name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(pass))) => self.record_success(&name, &pass),
                Ok((name, Err(e))) => {
                    summary.failed += 1;
                    self.ctx.metrics.files_failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        "Backup of {} failed this cycle (retried from last checkpoint): {}",
                        name, e
                    );
                    self.record_failure(&name, &e);
                }
                Err(join_error) => {
                    summary.failed += 1;
                    self.ctx.metrics.files_failed.fetch_add(1, Ordering::Relaxed);
                    error!("File task aborted: {}", join_error);
                }
            }
        }
        summary
    }

    fn record_success(&self, name: &str, pass: &PassSummary) {
        let mut entry = self
            .state
            .activity
            .entry(name.to_string())
            .or_insert_with(|| SourceActivity::new(&pass.destination));
        entry.offset = pass.new_offset;
        entry.lines_written += pass.lines_written;
        entry.lines_dropped += pass.lines_dropped;
        entry.last_error = None;
    }

    fn record_failure(&self, name: &str, error: &PipelineError) {
        if let Some(mut entry) = self.state.activity.get_mut(name) {
            entry.last_error = Some(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::backup::FsSink;
    use crate::checkpoint::CheckpointStore;
    use crate::conf::AgentConfig;
    use crate::source::{FsSource, LineRead, SourceError, SourceFile};
    use crate::state::AgentState;

    async fn shared_state(
        max_concurrent: usize,
        state_dir: &tempfile::TempDir,
    ) -> SharedState {
        let mut config = AgentConfig::default();
        config.max_concurrent_files = max_concurrent;
        let checkpoints = Arc::new(
            CheckpointStore::load(state_dir.path().join("checkpoints.json")).await,
        );
        Arc::new(AgentState::new(config, checkpoints))
    }

    // ── Isolation ───────────────────────────────────────────────

    /// Source provider that refuses to open one named file.
    struct PartiallyBrokenSource {
        inner: FsSource,
        broken: String,
    }

    #[async_trait]
    impl SourceProvider for PartiallyBrokenSource {
        async fn list_available(&self) -> Result<Vec<SourceFile>, SourceError> {
            self.inner.list_available().await
        }

        async fn open_from(
            &self,
            name: &str,
            offset: u64,
        ) -> Result<Box<dyn LineRead>, SourceError> {
            if name == self.broken {
                return Err(SourceError::Open(
                    name.to_string(),
                    "injected failure".to_string(),
                ));
            }
            self.inner.open_from(name, offset).await
        }
    }

    #[tokio::test]
    async fn test_one_broken_file_does_not_stop_siblings() {
        let source_dir = tempfile::tempdir().unwrap();
        let backup_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();

        for name in ["a.log", "bad.log", "c.log"] {
            tokio::fs::write(source_dir.path().join(name), "{\"n\":1}\n")
                .await
                .unwrap();
        }

        let state = shared_state(4, &state_dir).await;
        let source = Arc::new(PartiallyBrokenSource {
            inner: FsSource::new(source_dir.path()),
            broken: "bad.log".to_string(),
        });
        let sink = Arc::new(FsSink::new(backup_dir.path()));
        let orchestrator = Orchestrator::new(Arc::clone(&state), source, sink);

        let summary = orchestrator.run_cycle(&CancellationToken::new()).await;
        assert_eq!(summary.files, 3);
        assert_eq!(summary.failed, 1);

        // Siblings advanced their checkpoints despite the failure.
        assert_eq!(state.checkpoints.get_or_create("a.log").await.offset, 8);
        assert_eq!(state.checkpoints.get_or_create("c.log").await.offset, 8);
        assert_eq!(state.checkpoints.get_or_create("bad.log").await.offset, 0);

        // Activity reflects both outcomes.
        assert!(state.activity.get("a.log").unwrap().last_error.is_none());
        assert!(state.activity.get("bad.log").is_none()
            || state.activity.get("bad.log").unwrap().last_error.is_some());
    }

    // ── Concurrency bound ───────────────────────────────────────

    /// Reader that records how many instances are live at once.
    struct GaugedReader {
        lines: Vec<Bytes>,
        pos: u64,
        active: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LineRead for GaugedReader {
        async fn next_line(&mut self) -> Result<Option<Bytes>, SourceError> {
            // Hold the slot long enough for overlap to be observable.
            tokio::time::sleep(Duration::from_millis(10)).await;
            match self.lines.pop() {
                Some(line) => {
                    self.pos += line.len() as u64 + 1;
                    Ok(Some(line))
                }
                None => Ok(None),
            }
        }

        fn position(&self) -> u64 {
            self.pos
        }
    }

    impl Drop for GaugedReader {
        fn drop(&mut self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct GaugedSource {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        files: usize,
    }

    #[async_trait]
    impl SourceProvider for GaugedSource {
        async fn list_available(&self) -> Result<Vec<SourceFile>, SourceError> {
            Ok((0..self.files)
                .map(|i| SourceFile { name: format!("f{}.log", i), len: 8 })
                .collect())
        }

        async fn open_from(
            &self,
            _name: &str,
            _offset: u64,
        ) -> Result<Box<dyn LineRead>, SourceError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            Ok(Box::new(GaugedReader {
                lines: vec![Bytes::from("{\"n\":1}")],
                pos: 0,
                active: Arc::clone(&self.active),
            }))
        }
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_bound() {
        let backup_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let state = shared_state(2, &state_dir).await;
        let source = Arc::new(GaugedSource {
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
            files: 6,
        });
        let sink = Arc::new(FsSink::new(backup_dir.path()));
        let orchestrator = Orchestrator::new(state, source, sink);

        let summary = orchestrator.run_cycle(&CancellationToken::new()).await;
        assert_eq!(summary.files, 6);
        assert_eq!(summary.failed, 0);
        assert!(
            peak.load(Ordering::SeqCst) <= 2,
            "peak concurrency {} exceeded the bound",
            peak.load(Ordering::SeqCst)
        );
    }

    // ── Cancellation ────────────────────────────────────────────

    #[tokio::test]
    async fn test_cancelled_cycle_starts_no_files() {
        let source_dir = tempfile::tempdir().unwrap();
        let backup_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(source_dir.path().join("a.log"), "{\"n\":1}\n")
            .await
            .unwrap();

        let state = shared_state(2, &state_dir).await;
        let source = Arc::new(FsSource::new(source_dir.path()));
        let sink = Arc::new(FsSink::new(backup_dir.path()));
        let orchestrator = Orchestrator::new(Arc::clone(&state), source, sink);

        let cancel = CancellationToken::new();
        cancel.cancel();
        orchestrator.run_cycle(&cancel).await;

        // No file was started, so no checkpoint record was created.
        assert!(state.activity.is_empty());
        assert_eq!(state.metrics.files_seen.load(Ordering::Relaxed), 0);
    }

    // ── Enumeration failure ─────────────────────────────────────

    #[tokio::test]
    async fn test_enumeration_failure_yields_empty_cycle() {
        let missing = tempfile::tempdir().unwrap().path().join("gone");
        let backup_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();

        let state = shared_state(2, &state_dir).await;
        let source = Arc::new(FsSource::new(missing));
        let sink = Arc::new(FsSink::new(backup_dir.path()));
        let orchestrator = Orchestrator::new(state, source, sink);

        let summary = orchestrator.run_cycle(&CancellationToken::new()).await;
        assert_eq!(summary, CycleSummary::default());
    }
}
