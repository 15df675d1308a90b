//! File — the per-file incremental pipeline.
//!
//! One pass over one source file: compare current length to the stored
//! checkpoint, decide skip / reset / read, drive the mask engine line by
//! line, and advance the checkpoint to cover exactly the lines that were
//! fully handled.

use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::mask::{DropReason, LineOutcome};
use crate::source::{LineRead, SourceFile};

use super::{PassSummary, PipelineContext, PipelineError};

/// Run one pass for `file`.
///
/// The returned error (source read or destination write) means the rest of
/// the file was skipped this cycle; the checkpoint has already been saved
/// at the last fully-handled line, so the next cycle resumes exactly where
/// this one stopped and never skips an unwritten line.
pub async fn process_file(
    ctx: &PipelineContext,
    file: &SourceFile,
    cancel: &CancellationToken,
) -> Result<PassSummary, PipelineError> {
    let checkpoint = ctx.checkpoints.get_or_create(&file.name).await;
    let destination = checkpoint.destination;
    let mut offset = checkpoint.offset;

    if file.len == 0 {
        // Empty source still gets its backup artifact.
        ctx.sink.append(&destination, b"").await?;
        if offset != 0 {
            warn!(
                "Source {} shrank to empty (stored offset {}); resetting checkpoint",
                file.name, offset
            );
            ctx.metrics.truncations.fetch_add(1, Ordering::Relaxed);
            ctx.checkpoints.save(&file.name, 0).await?;
        }
        return Ok(PassSummary {
            destination,
            new_offset: 0,
            lines_written: 0,
            lines_dropped: 0,
        });
    }

    if file.len < offset {
        warn!(
            "Source {} truncated or rotated ({} bytes < stored offset {}); re-reading from the start",
            file.name, file.len, offset
        );
        ctx.metrics.truncations.fetch_add(1, Ordering::Relaxed);
        offset = 0;
    }

    if file.len == offset {
        // Nothing new; the file is not even opened.
        return Ok(PassSummary {
            destination,
            new_offset: offset,
            lines_written: 0,
            lines_dropped: 0,
        });
    }

    let mut reader = ctx.source.open_from(&file.name, offset).await?;
    let mut committed = offset;
    let mut written: u64 = 0;
    let mut dropped: u64 = 0;
    let mut failure: Option<PipelineError> = None;

    loop {
        // Cooperative cancellation: natural exit, current offset stands.
        if cancel.is_cancelled() {
            debug!("Cancelled; leaving {} at offset {}", file.name, committed);
            break;
        }
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                failure = Some(e.into());
                break;
            }
        };
        ctx.metrics.lines_read.fetch_add(1, Ordering::Relaxed);

        let text = String::from_utf8_lossy(&line);
        if text.trim().is_empty() {
            // Blank lines never reach the engine, but their bytes count.
            ctx.metrics.lines_blank.fetch_add(1, Ordering::Relaxed);
            committed = reader.position();
            continue;
        }

        match ctx.engine.sanitize_line(&text) {
            LineOutcome::Emit(clean) => {
                let mut payload = clean.into_bytes();
                payload.push(b'\n');
                if let Err(e) = ctx.sink.append(&destination, &payload).await {
                    // Do not advance past the unwritten line.
                    failure = Some(e.into());
                    break;
                }
                written += 1;
                ctx.metrics.lines_written.fetch_add(1, Ordering::Relaxed);
            }
            LineOutcome::Drop(reason) => {
                dropped += 1;
                match reason {
                    DropReason::Unparseable | DropReason::NotARecord => {
                        ctx.metrics.records_malformed.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "Dropping unparseable line in {} (bytes {}..{})",
                            file.name,
                            committed,
                            reader.position()
                        );
                    }
                    DropReason::SkippedRecord => {
                        ctx.metrics.records_skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    DropReason::Internal => {
                        ctx.metrics.records_malformed.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropping line in {}: re-serialization failed", file.name);
                    }
                }
            }
        }
        committed = reader.position();
    }

    if committed != offset {
        ctx.checkpoints.save(&file.name, committed).await?;
    }
    if let Some(error) = failure {
        return Err(error);
    }

    debug!(
        "{}: wrote {} line(s), dropped {}, offset {} -> {}",
        file.name, written, dropped, offset, committed
    );
    Ok(PassSummary {
        destination,
        new_offset: committed,
        lines_written: written,
        lines_dropped: dropped,
    })
}
