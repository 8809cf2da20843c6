//! Background loops — assignment polling and the archive sweep.
//!
//! Each loop is a spawned task driven by a `tokio::time::interval` raced
//! against a `watch` shutdown signal. Shutdown is cooperative at the cycle
//! boundary: a cycle already running drains to completion (so a family
//! group is never half-assigned), and a loop parked on its interval wakes
//! immediately instead of waiting out the tick. Cycle errors are logged and
//! the loop keeps going; a flaky API call should cost one cycle, not the
//! process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveOps, run_archive_sweep};
use crate::pipeline::orchestrator::AssignmentOrchestrator;
use crate::pipeline::types::{AssignmentSink, MessageSource, RawMessage};
use crate::roster::RosterIndex;

/// Seconds between archive sweeps. Staleness is measured in days, so
/// sweeping more than daily buys nothing.
const SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Spawn the assignment poll loop.
///
/// Returns a `JoinHandle` and a shutdown sender. Send `true` (or drop the
/// sender) to stop; the loop finishes any cycle in progress first, then
/// the handle resolves.
pub fn spawn_assignment_poller(
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn AssignmentSink>,
    orchestrator: Arc<AssignmentOrchestrator>,
    index: Arc<RosterIndex>,
    poll_interval_secs: u64,
    lookback_days: i64,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = poll_interval_secs,
            lookback_days, "Assignment poller started"
        );

        let mut tick = tokio::time::interval(Duration::from_secs(poll_interval_secs));

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Assignment poller shutting down");
                    return;
                }
                _ = tick.tick() => {
                    // Runs after the race is decided, so a started cycle
                    // always completes.
                    poll_once(&*source, &*sink, &orchestrator, &index, lookback_days).await;
                }
            }
        }
    });

    (handle, shutdown_tx)
}

/// Spawn the daily archive sweep loop.
pub fn spawn_archive_sweeper(
    ops: Arc<dyn ArchiveOps>,
    days_old: i64,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(days_old, "Archive sweeper started");

        let mut tick = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Archive sweeper shutting down");
                    return;
                }
                _ = tick.tick() => {
                    if let Err(e) = run_archive_sweep(&*ops, days_old).await {
                        error!("Archive sweep failed: {e}");
                    }
                }
            }
        }
    });

    (handle, shutdown_tx)
}

/// Run a single poll cycle: fetch unassigned conversations, pull their
/// messages, resolve, push assignments.
pub async fn poll_once(
    source: &dyn MessageSource,
    sink: &dyn AssignmentSink,
    orchestrator: &AssignmentOrchestrator,
    index: &RosterIndex,
    lookback_days: i64,
) {
    let conversations = match source.fetch_unassigned(lookback_days).await {
        Ok(convs) => convs,
        Err(e) => {
            error!("Conversation fetch failed: {e}");
            return;
        }
    };

    if conversations.is_empty() {
        debug!("No unassigned conversations this cycle");
        return;
    }
    debug!(count = conversations.len(), "Fetched unassigned conversations");

    let mut batch: Vec<RawMessage> = Vec::new();
    for conversation in &conversations {
        match source.fetch_messages(&conversation.id).await {
            Ok(messages) => batch.extend(messages),
            Err(e) => {
                // One broken conversation must not starve the rest.
                warn!(id = %conversation.id, "Message fetch failed: {e}");
            }
        }
    }

    let outcome = orchestrator.run(batch, index);

    let mut assigned = 0usize;
    for command in &outcome.commands {
        match sink.assign(command).await {
            Ok(()) => assigned += 1,
            Err(e) => {
                warn!(
                    conversation = %command.conversation_id,
                    attorney = %command.attorney,
                    "Assignment failed: {e}"
                );
            }
        }
    }

    for item in &outcome.review {
        info!(
            conversation = %item.conversation_id,
            name = %item.display_name,
            reason = %item.reason,
            "Needs manual review"
        );
    }

    info!(
        conversations = conversations.len(),
        assigned,
        review = outcome.review.len(),
        "Poll cycle complete"
    );
}
