//! Roster resolution — maps an extracted name to a responsible attorney.
//!
//! Resolution is tiered and short-circuiting:
//!   1. exact full-name lookup (fuzzy full-name under the edit-distance
//!      policy when the exact lookup comes back empty),
//!   2. surname lookup,
//!   3. external case identifier (A-number) lookup.
//! The first tier that produces exactly one attorney wins. A tier that
//! produces several *different* attorneys is an ambiguity, not a miss:
//! exact-tier ambiguity stops resolution immediately, surname-tier
//! ambiguity still lets the A-number tier try before giving up.

use strsim::levenshtein;
use tracing::debug;

use crate::matching::normalize;
use crate::pipeline::types::ExtractedName;
use crate::roster::{ClientRecord, RosterIndex};

/// Outcome of resolving one extracted name against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Exactly one attorney is responsible.
    Resolved(String),
    /// Several roster records with different attorneys fit; needs a human.
    Ambiguous(Vec<ClientRecord>),
    /// Nothing in the roster fits.
    Unresolved,
}

/// How the full-name tier compares names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Normalized string equality only.
    Exact,
    /// Per-part Levenshtein tolerance, applied only when the exact lookup
    /// finds nothing. Thresholds are inclusive maximum distances.
    EditDistance {
        first_name_threshold: usize,
        last_name_threshold: usize,
    },
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::EditDistance {
            first_name_threshold: 3,
            last_name_threshold: 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct Matcher {
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Resolve one extracted name. `expected_attorney` is a disambiguation
    /// hint (the attorney already chosen for the rest of the family, passed
    /// by the orchestrator for every member after the first resolution):
    /// when a tier yields several attorneys and the hint names one of them,
    /// that one wins.
    ///
    /// Note on surname collisions: several surname hits with *different*
    /// attorneys come back as `Ambiguous` carrying the candidates, not as a
    /// bare miss, so review output can show who the contenders were. Either
    /// way the caller assigns nothing.
    pub fn resolve(
        &self,
        name: &ExtractedName,
        index: &RosterIndex,
        expected_attorney: Option<&str>,
    ) -> MatchResult {
        let surname = name.surname_key();

        // Tier 1: full name. Only reachable when the body carried a first
        // name; surname-only events go straight to tier 2.
        if let Some(first) = name.first_name.as_deref().map(normalize).filter(|s| !s.is_empty()) {
            let key = if surname.is_empty() {
                first.clone()
            } else {
                format!("{first} {surname}")
            };
            let mut candidates = index.lookup_full_name(&key);
            if candidates.is_empty() {
                candidates = self.fuzzy_candidates(&first, &surname, index);
                if !candidates.is_empty() {
                    debug!(name = %name.display_name(), hits = candidates.len(), "Fuzzy full-name tier matched");
                }
            }
            match decide(&candidates, expected_attorney) {
                Decision::One(attorney) => return MatchResult::Resolved(attorney),
                // Exact-tier disagreement means two distinct clients share
                // the name; no later tier can safely override that.
                Decision::Several => {
                    return MatchResult::Ambiguous(
                        candidates.into_iter().cloned().collect(),
                    );
                }
                Decision::None => {}
            }
        }

        // Tier 2: surname only.
        let mut stashed_ambiguity: Option<Vec<ClientRecord>> = None;
        if !surname.is_empty() {
            let candidates = index.lookup_surname(&surname);
            match decide(&candidates, expected_attorney) {
                Decision::One(attorney) => return MatchResult::Resolved(attorney),
                Decision::Several => {
                    stashed_ambiguity = Some(candidates.into_iter().cloned().collect());
                }
                Decision::None => {}
            }
        }

        // Tier 3: A-number.
        if let Some(a_number) = name.a_number.as_deref() {
            if let Some(record) = index.lookup_case_identifier(a_number) {
                if let Some(attorney) = record.attorney() {
                    return MatchResult::Resolved(attorney.to_string());
                }
            }
        }

        match stashed_ambiguity {
            Some(candidates) => MatchResult::Ambiguous(candidates),
            None => MatchResult::Unresolved,
        }
    }

    /// Edit-distance scan of the whole roster, used when the exact
    /// full-name lookup misses. Returns records within threshold on both
    /// name parts, in roster order.
    fn fuzzy_candidates<'a>(
        &self,
        first: &str,
        surname: &str,
        index: &'a RosterIndex,
    ) -> Vec<&'a ClientRecord> {
        let MatchPolicy::EditDistance {
            first_name_threshold,
            last_name_threshold,
        } = self.policy
        else {
            return Vec::new();
        };

        index
            .records()
            .iter()
            .filter(|r| !r.last_name.is_empty())
            .filter(|r| {
                levenshtein(first, &r.first_name) <= first_name_threshold
                    && levenshtein(surname, &r.last_name) <= last_name_threshold
            })
            .collect()
    }
}

enum Decision {
    One(String),
    Several,
    None,
}

/// Collapse a candidate list to its attorney consensus. Several records
/// naming the *same* attorney (family rows, re-filed matters) are not an
/// ambiguity. The hint breaks ties when it names one of the candidates'
/// attorneys.
fn decide(candidates: &[&ClientRecord], expected_attorney: Option<&str>) -> Decision {
    let mut distinct: Vec<&str> = Vec::new();
    for record in candidates {
        if let Some(attorney) = record.attorney() {
            if !distinct.iter().any(|a| a.eq_ignore_ascii_case(attorney)) {
                distinct.push(attorney);
            }
        }
    }
    match distinct.as_slice() {
        [] => Decision::None,
        [only] => Decision::One(only.to_string()),
        several => {
            if let Some(hint) = expected_attorney.map(str::trim).filter(|s| !s.is_empty()) {
                if let Some(found) = several.iter().find(|a| a.eq_ignore_ascii_case(hint)) {
                    return Decision::One(found.to_string());
                }
            }
            Decision::Several
        }
    }
}
