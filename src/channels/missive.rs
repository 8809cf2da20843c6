//! Missive API client.
//!
//! Implements all three collaborator traits against the public REST API:
//! `MessageSource` (conversation/message reads), `AssignmentSink` (posts
//! with `add_assignees`) and `ArchiveOps` (user directory, stale listing,
//! posts with `close`). Rate limiting (429 + `Retry-After`) is handled
//! here with a bounded retry so callers never see it.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::archive::{ArchiveOps, StaleCandidate};
use crate::config::TriageConfig;
use crate::error::ChannelError;
use crate::extract::parse_timestamp;
use crate::matching::normalize;
use crate::pipeline::types::{AssignmentCommand, AssignmentSink, Conversation, MessageSource, RawMessage};

/// Page size for conversation listing.
const PAGE_LIMIT: usize = 50;
/// Messages fetched per conversation; court notifications arrive near the
/// top of the thread.
const MESSAGES_PER_CONVERSATION: usize = 10;
/// Retries for a single GET when the API rate-limits.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;
/// Hard cap on pagination depth, against a runaway `until` loop.
const MAX_PAGES: usize = 200;

pub struct MissiveClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    org_id: String,
    team_id: Option<String>,
    // Lazily fetched user directory, reused across assignments in a cycle.
    users: Mutex<Option<Vec<ApiUser>>>,
}

// ── API response shapes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    conversations: Vec<ApiConversation>,
}

#[derive(Debug, Deserialize)]
struct ApiConversation {
    id: String,
    #[serde(default)]
    last_activity_at: serde_json::Value,
    #[serde(default)]
    assignees: Vec<ApiUserRef>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    is_done: bool,
}

#[derive(Debug, Deserialize)]
struct ApiUserRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_deactivated: bool,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<ApiUser>,
}

impl MissiveClient {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            org_id: config.org_id.clone(),
            team_id: config.team_id.clone(),
            users: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// GET with bearer auth and bounded 429 retry.
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ChannelError> {
        let mut attempt = 0u32;
        loop {
            let response = self
                .http
                .get(self.url(path))
                .bearer_auth(self.token.expose_secret())
                .query(query)
                .send()
                .await
                .map_err(|e| ChannelError::RequestFailed {
                    endpoint: path.to_string(),
                    reason: e.to_string(),
                })?;

            if response.status().as_u16() == 429 && attempt < MAX_RATE_LIMIT_RETRIES {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(5);
                attempt += 1;
                warn!(endpoint = path, wait_secs = wait, attempt, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChannelError::ApiStatus {
                    endpoint: path.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            return response
                .json()
                .await
                .map_err(|e| ChannelError::InvalidResponse {
                    endpoint: path.to_string(),
                    reason: e.to_string(),
                });
        }
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::RequestFailed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::ApiStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Scope parameter for conversation listing: a specific team inbox, or
    /// the whole organization when no team is configured.
    fn scope_param(&self) -> (&'static str, String) {
        match &self.team_id {
            Some(team) => ("team_all", team.clone()),
            None => ("organization", self.org_id.clone()),
        }
    }

    /// Walk the conversation list newest-first, calling `visit` per page
    /// entry. `visit` returns `false` to stop pagination early.
    async fn walk_conversations<F>(&self, mut visit: F) -> Result<(), ChannelError>
    where
        F: FnMut(&ApiConversation, Option<DateTime<Utc>>) -> bool,
    {
        let scope = self.scope_param();
        let mut until: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![(scope.0, scope.1.clone()), ("limit", PAGE_LIMIT.to_string())];
            if let Some(u) = &until {
                query.push(("until", u.clone()));
            }

            let raw = self.get_json("conversations", &query).await?;
            let page: ConversationsPage =
                serde_json::from_value(raw).map_err(|e| ChannelError::InvalidResponse {
                    endpoint: "conversations".into(),
                    reason: e.to_string(),
                })?;
            if page.conversations.is_empty() {
                return Ok(());
            }

            for convo in &page.conversations {
                let ts = parse_timestamp(&convo.last_activity_at);
                if !visit(convo, ts) {
                    return Ok(());
                }
            }

            let last = &page.conversations[page.conversations.len() - 1];
            until = raw_timestamp_string(&last.last_activity_at);
            if until.is_none() || page.conversations.len() < PAGE_LIMIT {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn user_directory(&self) -> Result<Vec<ApiUser>, ChannelError> {
        let mut cache = self.users.lock().await;
        if let Some(users) = cache.as_ref() {
            return Ok(users.clone());
        }

        // The org-scoped endpoint is authoritative; the flat one is kept as
        // a fallback for tokens without org-level scope.
        let path = format!("organizations/{}/users", self.org_id);
        let raw = match self.get_json(&path, &[]).await {
            Ok(raw) => raw,
            Err(ChannelError::ApiStatus { status: 404, .. }) => {
                self.get_json("users", &[]).await?
            }
            Err(e) => return Err(e),
        };

        let page: UsersPage =
            serde_json::from_value(raw).map_err(|e| ChannelError::InvalidResponse {
                endpoint: "users".into(),
                reason: e.to_string(),
            })?;
        debug!(count = page.users.len(), "Fetched platform user directory");
        *cache = Some(page.users.clone());
        Ok(page.users)
    }
}

/// The raw `last_activity_at` value, stringified for the `until` cursor.
/// The API accepts back whatever format it emitted.
fn raw_timestamp_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Compare a configured attorney name to a platform display name,
/// tolerating case and diacritic differences.
fn names_match(wanted: &str, candidate: &str) -> bool {
    normalize(wanted.trim()) == normalize(candidate.trim())
}

/// Pull body and timestamp out of a full-message response. The `messages`
/// field is an object for single fetches but has shipped as a one-element
/// array; accept both.
fn unwrap_message_envelope(raw: &serde_json::Value) -> Option<&serde_json::Value> {
    let inner = raw.get("messages")?;
    match inner {
        serde_json::Value::Array(items) => items.first(),
        serde_json::Value::Object(_) => Some(inner),
        _ => None,
    }
}

// ── Collaborator trait impls ────────────────────────────────────────

#[async_trait]
impl MessageSource for MissiveClient {
    async fn fetch_unassigned(
        &self,
        lookback_days: i64,
    ) -> Result<Vec<Conversation>, ChannelError> {
        let start = Utc::now() - chrono::Duration::days(lookback_days);
        let mut found = Vec::new();

        self.walk_conversations(|convo, ts| {
            let Some(last_activity) = ts else {
                debug!(id = %convo.id, "Skipping conversation with unparseable last_activity_at");
                return true;
            };
            // Listing is newest-first: once past the lookback horizon,
            // every later page is older still.
            if last_activity < start {
                return false;
            }
            if convo.assignees.is_empty() {
                found.push(Conversation {
                    id: convo.id.clone(),
                    last_activity,
                });
            }
            true
        })
        .await?;

        debug!(count = found.len(), "Unassigned conversations in window");
        Ok(found)
    }

    async fn fetch_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RawMessage>, ChannelError> {
        let path = format!("conversations/{conversation_id}/messages");
        let raw = self
            .get_json(&path, &[("limit", MESSAGES_PER_CONVERSATION.to_string())])
            .await?;
        let page: MessagesPage =
            serde_json::from_value(raw).map_err(|e| ChannelError::InvalidResponse {
                endpoint: path.clone(),
                reason: e.to_string(),
            })?;

        // The listing carries ids only; body and timestamp need a full
        // per-message fetch.
        let mut messages = Vec::with_capacity(page.messages.len());
        for stub in &page.messages {
            let msg_path = format!("messages/{}", stub.id);
            let raw = self.get_json(&msg_path, &[]).await?;
            let Some(full) = unwrap_message_envelope(&raw) else {
                warn!(message_id = %stub.id, "Message response missing body envelope");
                continue;
            };
            let body = full
                .get("body")
                .and_then(|b| b.as_str())
                .unwrap_or_default()
                .to_string();
            let created_at = full
                .get("created_at")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            messages.push(RawMessage {
                id: stub.id.clone(),
                conversation_id: conversation_id.to_string(),
                body,
                created_at,
            });
        }
        Ok(messages)
    }
}

#[async_trait]
impl AssignmentSink for MissiveClient {
    async fn assign(&self, command: &AssignmentCommand) -> Result<(), ChannelError> {
        let users = self.user_directory().await?;
        let user = users
            .iter()
            .filter(|u| !u.is_deactivated)
            .find(|u| {
                u.name
                    .as_deref()
                    .is_some_and(|n| names_match(&command.attorney, n))
            })
            .ok_or_else(|| ChannelError::UnknownAssignee {
                name: command.attorney.clone(),
            })?;

        let body = serde_json::json!({
            "posts": {
                "conversation": command.conversation_id,
                "organization": self.org_id,
                "add_assignees": [user.id],
                "text": command.attorney,
                "notification": {
                    "title": "Assignment Notification",
                    "body": command.attorney,
                }
            }
        });
        self.post_json("posts", &body).await
    }
}

#[async_trait]
impl ArchiveOps for MissiveClient {
    async fn active_user_ids(&self) -> Result<HashSet<String>, ChannelError> {
        let users = self.user_directory().await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.is_deactivated)
            .map(|u| u.id)
            .collect())
    }

    async fn list_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StaleCandidate>, ChannelError> {
        let mut candidates = Vec::new();

        self.walk_conversations(|convo, ts| {
            let Some(last_activity) = ts else {
                return true;
            };
            if last_activity > cutoff {
                // Too recent; older ones are further down the listing.
                return true;
            }
            let closed = convo.is_done || convo.state.as_deref() == Some("closed");
            if !closed {
                candidates.push(StaleCandidate {
                    id: convo.id.clone(),
                    last_activity,
                    assignee_ids: convo.assignees.iter().map(|a| a.id.clone()).collect(),
                });
            }
            true
        })
        .await?;

        Ok(candidates)
    }

    async fn close_conversation(&self, conversation_id: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "posts": {
                "conversation": conversation_id,
                "organization": self.org_id,
                "close": true,
                "text": "Conversation closed by housekeeping.",
                "notification": {
                    "title": "Housekeeping",
                    "body": "Conversation closed by housekeeping.",
                }
            }
        });
        self.post_json("posts", &body).await
    }
}
