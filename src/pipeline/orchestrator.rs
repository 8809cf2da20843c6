//! Batch orchestrator — extraction, grouping, resolution, command emission.
//!
//! One `run` call handles one poll cycle's worth of raw messages. Every
//! decision here is pure and deterministic; the poller owns I/O on both
//! sides.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::extract::extract_event;
use crate::grouping::{FamilyGroup, group_by_family};
use crate::matching::{MatchResult, Matcher, OverrideTable};
use crate::pipeline::types::{AssignmentCommand, BatchOutcome, RawMessage, ReviewItem};
use crate::roster::RosterIndex;

pub struct AssignmentOrchestrator {
    matcher: Matcher,
    overrides: OverrideTable,
    window_minutes: i64,
}

impl AssignmentOrchestrator {
    pub fn new(matcher: Matcher, overrides: OverrideTable, window_minutes: i64) -> Self {
        Self {
            matcher,
            overrides,
            window_minutes,
        }
    }

    /// Process one batch of raw messages into assignment commands and
    /// review items.
    ///
    /// Within a family group, members are tried in chronological order and
    /// the first one that resolves decides the attorney for the whole
    /// group. Later members are still checked with that attorney as a
    /// disambiguation hint: a member pointing at a different attorney is
    /// logged, never split off. Groups where no member resolves become
    /// review items, one per conversation.
    pub fn run(&self, batch: Vec<RawMessage>, index: &RosterIndex) -> BatchOutcome {
        let total = batch.len();
        let events: Vec<_> = batch.iter().filter_map(extract_event).collect();
        debug!(messages = total, events = events.len(), "Extracted name events");

        let groups = group_by_family(events, self.window_minutes);
        let mut outcome = BatchOutcome::default();

        for group in &groups {
            self.process_group(group, index, &mut outcome);
        }

        info!(
            groups = groups.len(),
            commands = outcome.commands.len(),
            review = outcome.review.len(),
            "Batch processed"
        );
        outcome
    }

    fn process_group(&self, group: &FamilyGroup, index: &RosterIndex, outcome: &mut BatchOutcome) {
        let mut chosen: Option<String> = None;
        let mut ambiguous_reason: Option<String> = None;

        for member in &group.members {
            match self.matcher.resolve(member, index, chosen.as_deref()) {
                MatchResult::Resolved(attorney) => match &chosen {
                    None => chosen = Some(attorney),
                    Some(current) if !attorney.eq_ignore_ascii_case(current) => {
                        warn!(
                            surname = %group.surname_key,
                            member = %member.display_name(),
                            chosen = %current,
                            also = %attorney,
                            "Group member points at a different attorney; keeping the first resolution"
                        );
                    }
                    Some(_) => {}
                },
                MatchResult::Ambiguous(candidates) if chosen.is_none() => {
                    let attorneys: Vec<&str> = candidates
                        .iter()
                        .filter_map(|c| c.attorney())
                        .collect();
                    ambiguous_reason.get_or_insert_with(|| {
                        format!(
                            "ambiguous roster match ({} candidates: {})",
                            candidates.len(),
                            attorneys.join(", ")
                        )
                    });
                }
                MatchResult::Ambiguous(_) | MatchResult::Unresolved => {}
            }
        }

        if let Some(attorney) = chosen {
            self.emit_group(group, &attorney, outcome);
            return;
        }

        let reason = ambiguous_reason.unwrap_or_else(|| "no roster match".to_string());
        warn!(
            surname = %group.surname_key,
            members = group.members.len(),
            reason = %reason,
            "Family group needs manual review"
        );
        let mut seen = HashSet::new();
        for member in &group.members {
            if seen.insert(member.conversation_id.clone()) {
                outcome.review.push(ReviewItem {
                    conversation_id: member.conversation_id.clone(),
                    display_name: member.display_name(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// Emit one command per distinct conversation in the group, override
    /// table applied. Under dual-assign, the co-assignee gets its own
    /// command per conversation.
    fn emit_group(&self, group: &FamilyGroup, attorney: &str, outcome: &mut BatchOutcome) {
        let (primary, co_assignee) = self.overrides.apply(attorney);
        info!(
            surname = %group.surname_key,
            members = group.members.len(),
            attorney = %primary,
            "Family group resolved"
        );

        let mut seen = HashSet::new();
        for member in &group.members {
            if !seen.insert(member.conversation_id.clone()) {
                continue;
            }
            outcome.commands.push(AssignmentCommand {
                conversation_id: member.conversation_id.clone(),
                attorney: primary.clone(),
            });
            if let Some(co) = &co_assignee {
                outcome.commands.push(AssignmentCommand {
                    conversation_id: member.conversation_id.clone(),
                    attorney: co.clone(),
                });
            }
        }
    }
}
