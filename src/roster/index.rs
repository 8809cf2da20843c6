//! In-memory roster lookup index.
//!
//! Built once per run from the CSV rows and treated as read-only for the
//! rest of the cycle. Two lookup structures: exact full-name map (collisions
//! kept, never collapsed) and surname-only map.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::roster::model::{ClientRecord, RosterRow, parse_case_label};

/// Read-only lookup index over the client roster.
#[derive(Debug, Default)]
pub struct RosterIndex {
    records: Vec<ClientRecord>,
    by_full_name: HashMap<String, Vec<usize>>,
    by_surname: HashMap<String, Vec<usize>>,
}

impl RosterIndex {
    /// Build the index from raw roster rows.
    ///
    /// Rows missing a case label, or missing both attorney fields, cannot
    /// yield an actionable assignment and are skipped here (logged, not an
    /// error).
    pub fn build(rows: &[RosterRow]) -> Self {
        let mut index = RosterIndex::default();
        let mut skipped = 0usize;

        for (row_no, row) in rows.iter().enumerate() {
            let Some(case_name) = row.case_name.as_deref().filter(|s| !s.trim().is_empty())
            else {
                debug!(row = row_no, "Skipping roster row without a case label");
                skipped += 1;
                continue;
            };

            let lead = row
                .lead_attorney
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let originating = row
                .originating_attorney
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            if lead.is_none() && originating.is_none() {
                debug!(row = row_no, case = case_name, "Skipping roster row without any attorney");
                skipped += 1;
                continue;
            }

            let (first_name, last_name) = parse_case_label(case_name);
            let record = ClientRecord {
                first_name,
                last_name,
                primary_attorney: lead.unwrap_or_default().to_string(),
                secondary_attorney: originating.map(str::to_string),
                case_identifier: row
                    .a_number
                    .as_deref()
                    .map(|s| s.replace('-', ""))
                    .filter(|s| !s.is_empty()),
            };

            let idx = index.records.len();
            index
                .by_full_name
                .entry(record.full_name_key())
                .or_default()
                .push(idx);
            if !record.last_name.is_empty() {
                index
                    .by_surname
                    .entry(record.last_name.clone())
                    .or_default()
                    .push(idx);
            }
            index.records.push(record);
        }

        info!(
            records = index.records.len(),
            skipped,
            "Roster index built"
        );
        index
    }

    /// Records whose normalized full name equals `key`, in roster order.
    pub fn lookup_full_name(&self, key: &str) -> Vec<&ClientRecord> {
        self.by_full_name
            .get(key)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Records whose normalized surname equals `key`, in roster order.
    pub fn lookup_surname(&self, key: &str) -> Vec<&ClientRecord> {
        self.by_surname
            .get(key)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// First record carrying the given external case identifier, hyphens
    /// ignored on both sides.
    pub fn lookup_case_identifier(&self, id: &str) -> Option<&ClientRecord> {
        let wanted = id.replace('-', "");
        if wanted.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| r.case_identifier.as_deref() == Some(wanted.as_str()))
    }

    /// All records, in roster order.
    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
