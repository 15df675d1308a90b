//! Cycle — the interval-driven backup loop.
//!
//! One cooperative driver invokes the orchestrator at a fixed interval
//! until cancellation. No error condition stops the loop; a failed cycle
//! is simply retried at the next tick from the last saved checkpoints.

use std::time::{Duration, Instant};

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline::Orchestrator;
use crate::state::SharedState;

use super::stop;

/// Log a cumulative metrics snapshot this often.
const METRICS_LOG_EVERY: u64 = 30;

/// Wire the shutdown signal to a cancellation token and drive cycles
/// until it fires.
pub async fn run(
    state: SharedState,
    orchestrator: Orchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        stop::shutdown_signal().await;
        info!("Shutdown signal received; finishing in-flight files");
        signal_token.cancel();
    });

    run_cycles(state, orchestrator, cancel).await;
    Ok(())
}

/// The cycle loop proper, separated from signal wiring so it can be driven
/// with an explicit token.
pub async fn run_cycles(
    state: SharedState,
    orchestrator: Orchestrator,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(Duration::from_secs(state.config.cycle_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cycle_count: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        cycle_count = cycle_count.saturating_add(1);

        let started = Instant::now();
        let summary = orchestrator.run_cycle(&cancel).await;
        info!(
            "Cycle #{}: {} file(s), {} failed, {} source(s) tracked ({} ms)",
            cycle_count,
            summary.files,
            summary.failed,
            state.activity.len(),
            started.elapsed().as_millis()
        );

        if cycle_count % METRICS_LOG_EVERY == 0 {
            match serde_json::to_string(&state.metrics.snapshot()) {
                Ok(json) => info!("Cumulative metrics: {}", json),
                Err(e) => warn!("Failed to serialize metrics snapshot: {}", e),
            }
        }
    }
    info!("Cycle driver stopped after {} cycle(s)", cycle_count);
}
