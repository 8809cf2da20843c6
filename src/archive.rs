//! Stale-conversation sweep.
//!
//! Conversations whose assignees have all left the firm (or that never had
//! one) sit open forever and clutter the shared inbox. The sweep closes any
//! such conversation with no activity past the cutoff. Per-item close
//! failures are logged and skipped so one bad conversation never aborts
//! the sweep.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::ChannelError;

/// A closed-over conversation candidate as reported by the platform.
#[derive(Debug, Clone)]
pub struct StaleCandidate {
    pub id: String,
    pub last_activity: DateTime<Utc>,
    /// Platform user ids currently assigned, active or not.
    pub assignee_ids: Vec<String>,
}

/// Platform operations the sweep needs. Separate from `MessageSource`
/// because the sweep looks at *assigned* conversations, which the
/// assignment path never touches.
#[async_trait]
pub trait ArchiveOps: Send + Sync {
    /// Ids of users that are currently active in the org.
    async fn active_user_ids(&self) -> Result<HashSet<String>, ChannelError>;

    /// Open conversations with no activity since `cutoff`.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<StaleCandidate>, ChannelError>;

    /// Close one conversation.
    async fn close_conversation(&self, conversation_id: &str) -> Result<(), ChannelError>;
}

/// Counters from one sweep, for the cycle summary log.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: usize,
    pub closed: usize,
    pub failed: usize,
}

/// Close every stale conversation that has no active assignee.
///
/// "No active assignee" covers both the never-assigned and the
/// assigned-to-departed-staff cases. Conversations with at least one active
/// assignee are that person's problem, not the sweep's.
pub async fn run_archive_sweep(
    ops: &dyn ArchiveOps,
    days_old: i64,
) -> Result<SweepSummary, ChannelError> {
    let cutoff = Utc::now() - Duration::days(days_old);
    let active = ops.active_user_ids().await?;
    let candidates = ops.list_stale(cutoff).await?;

    let mut summary = SweepSummary {
        scanned: candidates.len(),
        ..SweepSummary::default()
    };

    for candidate in candidates {
        let has_active_owner = candidate.assignee_ids.iter().any(|id| active.contains(id));
        if has_active_owner {
            debug!(id = %candidate.id, "Stale but actively owned, leaving open");
            continue;
        }

        match ops.close_conversation(&candidate.id).await {
            Ok(()) => {
                info!(
                    id = %candidate.id,
                    last_activity = %candidate.last_activity,
                    "Closed unowned stale conversation"
                );
                summary.closed += 1;
            }
            Err(e) => {
                warn!(id = %candidate.id, error = %e, "Failed to close conversation");
                summary.failed += 1;
            }
        }
    }

    info!(
        scanned = summary.scanned,
        closed = summary.closed,
        failed = summary.failed,
        "Archive sweep finished"
    );
    Ok(summary)
}
