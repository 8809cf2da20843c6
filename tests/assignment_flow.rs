//! End-to-end assignment flow: roster CSV → poll cycle → assignment
//! commands, with the platform mocked at the collaborator traits.

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use intake_assist::error::ChannelError;
use intake_assist::matching::{MatchPolicy, Matcher, OverridePolicy, OverrideTable};
use intake_assist::pipeline::poller::poll_once;
use intake_assist::pipeline::{
    AssignmentCommand, AssignmentOrchestrator, AssignmentSink, Conversation, MessageSource,
    RawMessage,
};
use intake_assist::roster::{RosterIndex, load_roster};

struct FakeInbox {
    conversations: Vec<Conversation>,
    messages: Vec<RawMessage>,
}

#[async_trait]
impl MessageSource for FakeInbox {
    async fn fetch_unassigned(
        &self,
        _lookback_days: i64,
    ) -> Result<Vec<Conversation>, ChannelError> {
        Ok(self.conversations.clone())
    }

    async fn fetch_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RawMessage>, ChannelError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct RecordingSink {
    assigned: Mutex<Vec<AssignmentCommand>>,
}

#[async_trait]
impl AssignmentSink for RecordingSink {
    async fn assign(&self, command: &AssignmentCommand) -> Result<(), ChannelError> {
        self.assigned.lock().unwrap().push(command.clone());
        Ok(())
    }
}

fn roster_index(csv: &str) -> RosterIndex {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(csv.as_bytes()).unwrap();
    file.flush().unwrap();
    let rows = load_roster(file.path()).unwrap();
    RosterIndex::build(&rows)
}

fn conversation(id: &str) -> Conversation {
    Conversation {
        id: id.into(),
        last_activity: Utc::now(),
    }
}

fn message(id: &str, conv: &str, body: &str, offset_min: i64) -> RawMessage {
    let ts = Utc::now() - Duration::hours(1) + Duration::minutes(offset_min);
    RawMessage {
        id: id.into(),
        conversation_id: conv.into(),
        body: body.into(),
        created_at: serde_json::json!(ts.timestamp()),
    }
}

fn orchestrator_with(overrides: OverrideTable, window_minutes: i64) -> AssignmentOrchestrator {
    AssignmentOrchestrator::new(Matcher::new(MatchPolicy::default()), overrides, window_minutes)
}

#[tokio::test]
async fn family_spread_across_conversations_is_assigned_together() {
    let index = roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         John Smith - Asylum,A. Attorney,,\n",
    );

    // Two notifications minutes apart: the roster client and a spouse who
    // is not in the roster. Same surname, inside the window.
    let inbox = FakeInbox {
        conversations: vec![conversation("conv-1"), conversation("conv-2")],
        messages: vec![
            message("m1", "conv-1", "Noncitizen Name: SMITH, John", 0),
            message("m2", "conv-2", "Noncitizen Name: SMITH, Jane", 5),
        ],
    };
    let sink = RecordingSink::default();

    poll_once(
        &inbox,
        &sink,
        &orchestrator_with(OverrideTable::default(), 10),
        &index,
        3,
    )
    .await;

    let assigned = sink.assigned.lock().unwrap();
    assert_eq!(assigned.len(), 2);
    for command in assigned.iter() {
        assert_eq!(command.attorney, "A. Attorney");
    }
    let mut conversations: Vec<&str> =
        assigned.iter().map(|c| c.conversation_id.as_str()).collect();
    conversations.sort();
    assert_eq!(conversations, vec!["conv-1", "conv-2"]);
}

#[tokio::test]
async fn same_surname_outside_window_stays_separate() {
    let index = roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         John Smith - Asylum,A. Attorney,,\n",
    );

    // Jane arrives 45 minutes later than the 10-minute window allows, so
    // her unmatched conversation is not carried by John's match.
    let inbox = FakeInbox {
        conversations: vec![conversation("conv-1"), conversation("conv-2")],
        messages: vec![
            message("m1", "conv-1", "Noncitizen Name: SMITH, John", 0),
            message("m2", "conv-2", "Noncitizen Name: SMITH, Janet", 45),
        ],
    };
    let sink = RecordingSink::default();

    poll_once(
        &inbox,
        &sink,
        &orchestrator_with(OverrideTable::default(), 10),
        &index,
        3,
    )
    .await;

    let assigned = sink.assigned.lock().unwrap();
    // Janet's own group still resolves via the unique-surname tier, so
    // both end up with the attorney, but as two independent groups.
    assert_eq!(assigned.len(), 2);
}

#[tokio::test]
async fn override_redirects_assignment() {
    let index = roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         John Smith - Asylum,A. Attorney,,\n",
    );
    let mut overrides = OverrideTable::new(OverridePolicy::Rewrite);
    overrides.insert("A. Attorney", "B. Backup");

    let inbox = FakeInbox {
        conversations: vec![conversation("conv-1")],
        messages: vec![message("m1", "conv-1", "Noncitizen Name: SMITH, John", 0)],
    };
    let sink = RecordingSink::default();

    poll_once(&inbox, &sink, &orchestrator_with(overrides, 10), &index, 3).await;

    let assigned = sink.assigned.lock().unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].attorney, "B. Backup");
}

#[tokio::test]
async fn html_notification_with_typo_still_resolves() {
    let index = roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         Ahmet Yılmaz - Asylum,Jane Roe,,\n",
    );

    // ASCII-folded surname with a one-letter typo in an HTML table body;
    // the edit-distance policy absorbs it.
    let inbox = FakeInbox {
        conversations: vec![conversation("conv-1")],
        messages: vec![message(
            "m1",
            "conv-1",
            "<table><tr><td>Noncitizen Name: YILMAS, Ahmed</td></tr></table>",
            0,
        )],
    };
    let sink = RecordingSink::default();

    poll_once(
        &inbox,
        &sink,
        &orchestrator_with(OverrideTable::default(), 10),
        &index,
        3,
    )
    .await;

    let assigned = sink.assigned.lock().unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].attorney, "Jane Roe");
}

#[tokio::test]
async fn unknown_client_is_not_assigned() {
    let index = roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         John Smith - Asylum,A. Attorney,,\n",
    );

    let inbox = FakeInbox {
        conversations: vec![conversation("conv-1")],
        messages: vec![message("m1", "conv-1", "Noncitizen Name: GONZALEZ, Maria", 0)],
    };
    let sink = RecordingSink::default();

    poll_once(
        &inbox,
        &sink,
        &orchestrator_with(OverrideTable::default(), 10),
        &index,
        3,
    )
    .await;

    assert!(sink.assigned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn arc_wrapped_collaborators_work_across_tasks() {
    // The production wiring shares the source and sink between tasks.
    let index = Arc::new(roster_index(
        "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
         John Smith - Asylum,A. Attorney,,\n",
    ));
    let inbox: Arc<dyn MessageSource> = Arc::new(FakeInbox {
        conversations: vec![conversation("conv-1")],
        messages: vec![message("m1", "conv-1", "Noncitizen Name: SMITH, John", 0)],
    });
    let sink = Arc::new(RecordingSink::default());
    let orch = Arc::new(orchestrator_with(OverrideTable::default(), 10));

    let sink_dyn: Arc<dyn AssignmentSink> = Arc::clone(&sink) as _;
    let task = tokio::spawn({
        let index = Arc::clone(&index);
        async move { poll_once(&*inbox, &*sink_dyn, &orch, &index, 3).await }
    });
    task.await.unwrap();

    assert_eq!(sink.assigned.lock().unwrap().len(), 1);
}
