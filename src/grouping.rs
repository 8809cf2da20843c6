//! Temporal grouping — clusters name events into family units.
//!
//! Family members' filings arrive as separate emails within minutes of each
//! other, but only the lead applicant appears in the roster. Grouping by
//! normalized surname plus temporal proximity lets one roster hit assign
//! the whole family consistently.
//!
//! Chained-interval semantics: a new group starts whenever the gap to the
//! *immediately preceding* event exceeds the window, so a group's total span
//! may exceed the window as long as no single gap does.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::pipeline::types::ExtractedName;

/// A cluster of name events believed to belong to one family/case.
#[derive(Debug, Clone)]
pub struct FamilyGroup {
    pub surname_key: String,
    pub members: Vec<ExtractedName>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Cluster `events` by normalized surname and a sliding time window.
///
/// Deterministic and order-preserving: surname partitions appear in
/// first-encounter order, groups within a partition in chronological order.
pub fn group_by_family(events: Vec<ExtractedName>, window_minutes: i64) -> Vec<FamilyGroup> {
    let window = Duration::minutes(window_minutes);

    // Partition by surname key, preserving first-encounter order.
    let mut order: Vec<String> = Vec::new();
    let mut partitions: HashMap<String, Vec<ExtractedName>> = HashMap::new();
    for event in events {
        let key = event.surname_key();
        partitions
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(event);
    }

    let mut groups = Vec::new();
    for key in order {
        let mut members = partitions.remove(&key).expect("partition exists");
        members.sort_by_key(|e| e.observed_at);

        let mut current: Vec<ExtractedName> = Vec::new();
        for event in members {
            let fresh_gap = current
                .last()
                .is_some_and(|prev| event.observed_at - prev.observed_at > window);
            if fresh_gap {
                groups.push(seal(&key, std::mem::take(&mut current)));
            }
            current.push(event);
        }
        if !current.is_empty() {
            groups.push(seal(&key, current));
        }
    }
    groups
}

fn seal(key: &str, members: Vec<ExtractedName>) -> FamilyGroup {
    let window_start = members.first().expect("non-empty group").observed_at;
    let window_end = members.last().expect("non-empty group").observed_at;
    FamilyGroup {
        surname_key: key.to_string(),
        members,
        window_start,
        window_end,
    }
}
