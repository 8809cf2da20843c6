//! Roster record model and case-label name parsing.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::matching::normalize;

/// One row of the practice-management CSV export, as shipped.
///
/// Column headers match the export verbatim; the loader deserializes them
/// without renaming so a fresh export drops in unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRow {
    #[serde(rename = "Case/Matter Name", default)]
    pub case_name: Option<String>,
    #[serde(rename = "Lead Attorney", default)]
    pub lead_attorney: Option<String>,
    #[serde(rename = "Originating Attorney", default)]
    pub originating_attorney: Option<String>,
    #[serde(rename = "A Number", default)]
    pub a_number: Option<String>,
}

/// A client with a responsible attorney, ready for matching.
///
/// `first_name`/`last_name` are stored pre-normalized (uppercased,
/// diacritics folded) so lookups never re-normalize the roster side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub first_name: String,
    pub last_name: String,
    pub primary_attorney: String,
    pub secondary_attorney: Option<String>,
    pub case_identifier: Option<String>,
}

impl ClientRecord {
    /// Normalized "FIRST LAST" key for exact lookups.
    pub fn full_name_key(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    /// The attorney this record assigns to: primary, falling back to
    /// secondary when the primary field is blank.
    pub fn attorney(&self) -> Option<&str> {
        if !self.primary_attorney.trim().is_empty() {
            Some(self.primary_attorney.trim())
        } else {
            self.secondary_attorney
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        }
    }
}

fn family_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "ve Ailesi" / "ve eşi" — "and family" / "and spouse" qualifiers that
    // the case label appends after the lead applicant's name. The character
    // class covers dotted/dotless capital I, which (?i) alone does not fold.
    RE.get_or_init(|| Regex::new(r"(?i)\s+ve\s+(ailesi|eş[iİı])").unwrap())
}

/// Split a free-text case label into normalized (first, last) name parts.
///
/// The label format is `Client Name - case metadata`; everything after the
/// first hyphen is metadata. The trailing family qualifier is stripped, the
/// final token becomes the surname, and the remaining tokens (joined) the
/// first name. Single-token labels get an empty surname.
pub fn parse_case_label(label: &str) -> (String, String) {
    let name_part = match label.split_once('-') {
        Some((name, _)) => name.trim(),
        None => label.trim(),
    };
    let cleaned = family_suffix_re().replace_all(name_part, "");

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (normalize(only), String::new()),
        [init @ .., last] => (normalize(&init.join(" ")), normalize(last)),
    }
}
