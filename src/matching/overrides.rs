//! Assignment override table.
//!
//! Some matters are handed off after the roster export was taken (leave,
//! departures, internal reshuffles). The override table rewrites the
//! matched attorney to the current owner without touching the roster file.

use std::collections::HashMap;

use crate::error::ConfigError;

/// What to do when an override fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// Replace the matched attorney with the override target.
    #[default]
    Rewrite,
    /// Assign the override target *and* keep the matched attorney as a
    /// co-assignee, so the original owner stays in the loop.
    DualAssign,
}

impl OverridePolicy {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rewrite" => Ok(OverridePolicy::Rewrite),
            "dual-assign" => Ok(OverridePolicy::DualAssign),
            other => Err(ConfigError::InvalidValue {
                key: "INTAKE_OVERRIDE_POLICY".into(),
                message: format!("expected 'rewrite' or 'dual-assign', got '{other}'"),
            }),
        }
    }
}

/// Case-insensitive attorney-name rewrite map.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    // Keyed by lowercased trimmed source name; value keeps original casing.
    entries: HashMap<String, String>,
    policy: OverridePolicy,
}

impl OverrideTable {
    pub fn new(policy: OverridePolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Parse a `Old Name=New Name,Other=Target` config string.
    pub fn parse(spec: &str, policy: OverridePolicy) -> Result<Self, ConfigError> {
        let mut table = OverrideTable::new(policy);
        for pair in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((from, to)) = pair.split_once('=') else {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_OVERRIDES".into(),
                    message: format!("expected 'Old=New' pair, got '{pair}'"),
                });
            };
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_OVERRIDES".into(),
                    message: format!("empty side in pair '{pair}'"),
                });
            }
            table.insert(from, to);
        }
        Ok(table)
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        self.entries
            .insert(from.trim().to_lowercase(), to.trim().to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the table to a matched attorney. Returns the attorney to
    /// assign plus an optional co-assignee (under `DualAssign`, the
    /// originally matched attorney).
    pub fn apply(&self, attorney: &str) -> (String, Option<String>) {
        match self.entries.get(&attorney.trim().to_lowercase()) {
            Some(target) => {
                let co = match self.policy {
                    OverridePolicy::Rewrite => None,
                    OverridePolicy::DualAssign => Some(attorney.trim().to_string()),
                };
                (target.clone(), co)
            }
            None => (attorney.trim().to_string(), None),
        }
    }
}
