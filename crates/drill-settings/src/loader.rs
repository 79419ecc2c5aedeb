//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{DrillSettings, LogLevel};

/// Directory holding settings and databases (`~/.crisisdrill`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".crisisdrill")
}

/// Resolve the path to the settings file (`~/.crisisdrill/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DrillSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DrillSettings> {
    let defaults = serde_json::to_value(DrillSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DrillSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DRILL_*` environment variable overrides.
///
/// Invalid values are logged and ignored (the file/default value stays).
pub fn apply_env_overrides(settings: &mut DrillSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
pub fn apply_overrides_with<F>(settings: &mut DrillSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvSource { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("DRILL_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("DRILL_PORT", |s| parse_u16_range(s, 0, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("DRILL_MAX_CONNECTIONS", |s| {
        parse_usize_range(s, 1, 1_000_000)
    }) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.parsed("DRILL_SEND_QUEUE", |s| parse_usize_range(s, 1, 65_536)) {
        settings.server.send_queue_capacity = v;
    }

    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = env.string("DRILL_DB_PATH") {
        settings.database.path = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("DRILL_LOG_LEVEL", LogLevel::parse) {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("DRILL_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }

    // ── Scenario generation ─────────────────────────────────────────
    if let Some(v) = env.string("DRILL_SCENARIO_MODEL") {
        settings.scenario.model = v;
    }
    if let Some(v) = env.string("DRILL_SCENARIO_API_URL") {
        settings.scenario.api_url = v;
    }

    // ── Mail ────────────────────────────────────────────────────────
    if let Some(v) = env.parsed("DRILL_MAIL_ENABLED", parse_bool) {
        settings.mail.enabled = v;
    }
    if let Some(v) = env.string("DRILL_MAIL_RELAY_URL") {
        settings.mail.relay_url = v;
    }
    if let Some(v) = env.string("DRILL_MAIL_FROM") {
        settings.mail.from_address = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Variable readers ────────────────────────────────────────────────────────

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}
