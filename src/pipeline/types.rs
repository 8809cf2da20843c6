//! Shared types for the assignment pipeline.
//!
//! The collaborator traits at the bottom are the only seam between the
//! matching core and the messaging platform: the core consumes raw messages
//! and emits assignment commands, nothing else crosses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::matching::normalize;

// ── Inbound ─────────────────────────────────────────────────────────

/// An unassigned conversation in the team inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub last_activity: DateTime<Utc>,
}

/// A raw message as delivered by the platform.
///
/// `created_at` is kept as the raw JSON value because the platform is
/// inconsistent: epoch seconds, epoch milliseconds, and ISO-8601 strings all
/// occur in the wild. `extract::parse_timestamp` normalizes it exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    pub conversation_id: String,
    pub body: String,
    #[serde(default)]
    pub created_at: serde_json::Value,
}

/// A client name extracted from one message body.
///
/// Only produced when a surname was parsed — messages without one are
/// dropped upstream and never enter the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedName {
    pub first_name: Option<String>,
    pub last_name: String,
    pub message_id: String,
    pub conversation_id: String,
    pub observed_at: DateTime<Utc>,
    /// External case identifier (A-number) found in the same body, if any.
    pub a_number: Option<String>,
}

impl ExtractedName {
    /// Normalized surname key used for grouping and surname-tier matching.
    pub fn surname_key(&self) -> String {
        normalize(&self.last_name)
    }

    /// "First Last" as extracted, for logs and review reports.
    pub fn display_name(&self) -> String {
        match &self.first_name {
            Some(first) => format!("{} {}", first, self.last_name),
            None => self.last_name.clone(),
        }
    }
}

// ── Outbound ────────────────────────────────────────────────────────

/// The sole output artifact: assign one conversation to one attorney,
/// identified by display name. The sink resolves the name to a platform
/// user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCommand {
    pub conversation_id: String,
    pub attorney: String,
}

/// A group that could not be auto-assigned, surfaced for manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub conversation_id: String,
    pub display_name: String,
    pub reason: String,
}

/// Outcome of one orchestrator batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub commands: Vec<AssignmentCommand>,
    pub review: Vec<ReviewItem>,
}

// ── Collaborator traits ─────────────────────────────────────────────

/// Supplies candidate conversations and their messages. Pure I/O — rate
/// limiting, pagination and retries live behind this trait, never in the
/// core.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch unassigned conversations with activity in the last
    /// `lookback_days`.
    async fn fetch_unassigned(&self, lookback_days: i64)
    -> Result<Vec<Conversation>, ChannelError>;

    /// Fetch recent messages (bodies and timestamps included) for one
    /// conversation.
    async fn fetch_messages(&self, conversation_id: &str)
    -> Result<Vec<RawMessage>, ChannelError>;
}

/// Accepts assignment commands. Failure to resolve or assign is a per-item
/// error reported back to the caller; the core never retries.
#[async_trait]
pub trait AssignmentSink: Send + Sync {
    async fn assign(&self, command: &AssignmentCommand) -> Result<(), ChannelError>;
}
