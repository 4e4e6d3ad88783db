//! Board configuration.
//!
//! Settings are layered: an optional TOML file, then `OPSBOARD_*`
//! environment variables (nested keys use `__`, e.g.
//! `OPSBOARD_SOURCE__API_KEY`), then command-line flags applied by the
//! binary. The result is turned into the engine's [`SyncConfig`] and the
//! display [`PriorityRules`].
//!
//! ```toml
//! profile = "replies"
//! cache_dir = "/var/cache/opsboard"
//!
//! [source]
//! spreadsheet = "1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"
//! range = "Replies!A1:G"
//! api_key = "AIza..."
//!
//! [policy]
//! ttl = "45s"
//! poll_idle = "5m"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use opsboard_sync::{PendingRule, SyncConfig};
use opsboard_types::{FingerprintFields, PriorityRules};
use serde::Deserialize;

use crate::data::duration::parse_duration;

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "opsboard.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "OPSBOARD";

/// Which board preset to start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Support-ticket board.
    #[default]
    Tickets,
    /// Reply-queue board (tighter pending cadence).
    Replies,
}

impl Profile {
    /// Engine preset for this profile.
    pub fn sync_config(self) -> SyncConfig {
        match self {
            Profile::Tickets => SyncConfig::support_tickets(),
            Profile::Replies => SyncConfig::reply_queue(),
        }
    }

    /// Status values treated as pending by this profile.
    pub fn pending_statuses(self) -> &'static [&'static str] {
        match self {
            Profile::Tickets => &["pending", "in_progress", "escalated"],
            Profile::Replies => &["pending_review", "awaiting_reply", "draft"],
        }
    }

    /// Display priority rules for this profile.
    pub fn priority_rules(self) -> PriorityRules {
        let needs_action = self
            .pending_statuses()
            .iter()
            .filter(|s| **s != "escalated")
            .map(|s| s.to_string())
            .collect();
        PriorityRules {
            needs_action,
            ..PriorityRules::default()
        }
    }
}

/// Where the board reads from.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// Full values API URL.
    pub url: Option<String>,
    /// Values API endpoint, used with `spreadsheet` and `range`.
    pub endpoint: Option<String>,
    pub spreadsheet: Option<String>,
    pub range: Option<String>,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    /// Local JSON file; takes precedence over HTTP settings.
    pub file: Option<PathBuf>,
}

/// Optional overrides of the profile's policy durations.
///
/// Durations are human strings such as `"30s"`, `"2m"` or `"500ms"`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyOverrides {
    pub ttl: Option<String>,
    pub pending_ttl: Option<String>,
    pub degraded_ttl: Option<String>,
    pub poll_pending: Option<String>,
    pub poll_active: Option<String>,
    pub poll_idle: Option<String>,
    pub activity_window: Option<String>,
    pub max_interval: Option<String>,
    pub hard_stop_failures: Option<u32>,
    pub backoff_base: Option<String>,
    pub backoff_max_delay: Option<String>,
    pub backoff_max_multiplier: Option<u32>,
    pub fetch_timeout: Option<String>,
}

/// Complete board configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoardConfig {
    pub profile: Profile,
    /// Overrides the profile's source key (names the backup file).
    pub key: Option<String>,
    pub source: SourceConfig,
    /// Directory for last-known-good backups. Backups are disabled when unset.
    pub cache_dir: Option<PathBuf>,
    /// Log destination. Logging is disabled when unset.
    pub log_file: Option<PathBuf>,
    pub policy: PolicyOverrides,
    /// Identity / status / modified column names.
    pub fingerprint: Option<FingerprintFields>,
    /// Status values that count as pending; replaces the profile's list.
    pub pending_statuses: Option<Vec<String>>,
    /// Display priority rules; replaces the profile's rules.
    pub priority: Option<PriorityRules>,
}

impl BoardConfig {
    /// Load from `path` (required) or [`DEFAULT_CONFIG_FILE`] (optional),
    /// layered with `OPSBOARD_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(env_source())
            .build()
            .and_then(|config| config.try_deserialize())
            .with_context(|| match path {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })
    }

    /// Parse a TOML document, without environment overrides.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Display priority rules in effect.
    pub fn priority_rules(&self) -> PriorityRules {
        let mut rules = self
            .priority
            .clone()
            .unwrap_or_else(|| self.profile.priority_rules());
        if let Some(ref fields) = self.fingerprint {
            if self.priority.is_none() {
                rules.status_field = fields.status.clone();
                rules.recency_field = fields.modified.clone();
            }
        }
        rules
    }

    /// Engine configuration: the profile preset with every override applied.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = self.profile.sync_config();

        if let Some(ref key) = self.key {
            config.key = key.clone();
        }
        if let Some(ref fields) = self.fingerprint {
            config.fingerprint = fields.clone();
        }

        let status_field = config.fingerprint.status.clone();
        config.pending = match self.pending_statuses {
            Some(ref values) if values.is_empty() => PendingRule::Never,
            Some(ref values) => PendingRule::status_in(status_field, values.iter().cloned()),
            None => PendingRule::status_in(status_field, self.profile.pending_statuses().iter().copied()),
        };

        let p = &self.policy;
        apply(&mut config.ttl.base, &p.ttl, "policy.ttl")?;
        apply(&mut config.ttl.pending, &p.pending_ttl, "policy.pending_ttl")?;
        apply(&mut config.ttl.degraded, &p.degraded_ttl, "policy.degraded_ttl")?;
        apply(&mut config.poll.pending, &p.poll_pending, "policy.poll_pending")?;
        apply(&mut config.poll.active, &p.poll_active, "policy.poll_active")?;
        apply(&mut config.poll.idle, &p.poll_idle, "policy.poll_idle")?;
        apply(&mut config.poll.activity_window, &p.activity_window, "policy.activity_window")?;
        apply(&mut config.poll.max_interval, &p.max_interval, "policy.max_interval")?;
        apply(&mut config.backoff.base_delay, &p.backoff_base, "policy.backoff_base")?;
        apply(&mut config.backoff.max_delay, &p.backoff_max_delay, "policy.backoff_max_delay")?;
        apply(&mut config.fetch_timeout, &p.fetch_timeout, "policy.fetch_timeout")?;
        if let Some(n) = p.hard_stop_failures {
            config.poll.hard_stop_failures = n;
        }
        if let Some(n) = p.backoff_max_multiplier {
            config.backoff.max_multiplier = n.max(1);
        }

        Ok(config)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn apply(target: &mut Duration, value: &Option<String>, name: &str) -> Result<()> {
    if let Some(raw) = value {
        *target = parse_duration(raw).with_context(|| format!("Invalid duration for {}", name))?;
    }
    Ok(())
}
