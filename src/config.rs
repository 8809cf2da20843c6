//! Runtime configuration, read from `INTAKE_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::matching::{MatchPolicy, OverridePolicy, OverrideTable};

/// Everything the binary needs to run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Platform API token.
    pub api_token: SecretString,
    /// Organization the target inbox belongs to.
    pub org_id: String,
    /// Team whose shared inbox is polled. `None` polls the whole org.
    pub team_id: Option<String>,
    /// Platform API base URL.
    pub api_base_url: String,
    /// Path to the practice-management CSV export.
    pub roster_path: PathBuf,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Family grouping window, in minutes.
    pub time_window_minutes: i64,
    /// How far back to look for unassigned conversations.
    pub lookback_days: i64,
    /// Full-name matching policy.
    pub match_policy: MatchPolicy,
    /// Attorney override table.
    pub overrides: OverrideTable,
    /// Whether the stale-conversation sweep runs.
    pub archive_enabled: bool,
    /// Conversations untouched for this many days are sweep candidates.
    pub archive_days_old: i64,
}

impl TriageConfig {
    /// Load from the environment. `INTAKE_API_TOKEN`, `INTAKE_ORG_ID` and
    /// `INTAKE_ROSTER_PATH` are required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = SecretString::from(required("INTAKE_API_TOKEN")?);
        let org_id = required("INTAKE_ORG_ID")?;
        let roster_path = PathBuf::from(required("INTAKE_ROSTER_PATH")?);

        let team_id = std::env::var("INTAKE_TEAM_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let api_base_url = std::env::var("INTAKE_API_BASE_URL")
            .unwrap_or_else(|_| "https://public.missiveapp.com/v1".to_string());

        let poll_interval_secs = parse_var("INTAKE_POLL_INTERVAL_SECS", 150u64)?;
        let time_window_minutes = parse_var("INTAKE_TIME_WINDOW_MINUTES", 30i64)?;
        let lookback_days = parse_var("INTAKE_LOOKBACK_DAYS", 3i64)?;

        let match_policy = match std::env::var("INTAKE_MATCH_POLICY")
            .unwrap_or_else(|_| "edit-distance".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "exact" => MatchPolicy::Exact,
            "edit-distance" => MatchPolicy::EditDistance {
                first_name_threshold: parse_var("INTAKE_FIRST_NAME_THRESHOLD", 3usize)?,
                last_name_threshold: parse_var("INTAKE_LAST_NAME_THRESHOLD", 3usize)?,
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_MATCH_POLICY".into(),
                    message: format!("expected 'exact' or 'edit-distance', got '{other}'"),
                });
            }
        };

        let override_policy = match std::env::var("INTAKE_OVERRIDE_POLICY") {
            Ok(value) => OverridePolicy::parse(&value)?,
            Err(_) => OverridePolicy::default(),
        };
        let overrides = OverrideTable::parse(
            &std::env::var("INTAKE_OVERRIDES").unwrap_or_default(),
            override_policy,
        )?;

        let archive_enabled = parse_var("INTAKE_ARCHIVE_ENABLED", true)?;
        let archive_days_old = parse_var("INTAKE_ARCHIVE_DAYS_OLD", 30i64)?;

        Ok(Self {
            api_token,
            org_id,
            team_id,
            api_base_url,
            roster_path,
            poll_interval_secs,
            time_window_minutes,
            lookback_days,
            match_policy,
            overrides,
            archive_enabled,
            archive_days_old,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an optional env var, defaulting when unset but erroring loudly on
/// garbage. A typo'd interval should stop startup, not silently become the
/// default.
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{}'", raw.trim()),
        }),
        Err(_) => Ok(default),
    }
}
