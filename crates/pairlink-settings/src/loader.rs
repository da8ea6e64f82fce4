//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::PairlinkSettings;

/// Resolve the path to the settings file (`~/.pairlink/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".pairlink").join("settings.json")
}

/// Settings plus what happened while loading them.
///
/// Loading runs before the tracing subscriber exists (the subscriber is
/// configured from these very settings), so nothing is logged during the
/// load itself. Call [`LoadedSettings::log`] once telemetry is up.
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: PairlinkSettings,
    /// The settings file that was looked up.
    pub path: PathBuf,
    /// Whether that file existed and was merged.
    pub from_file: bool,
    /// Env overrides that were present but unusable.
    pub rejected: Vec<RejectedOverride>,
}

impl LoadedSettings {
    /// Emit the deferred load diagnostics through `tracing`.
    pub fn log(&self) {
        if self.from_file {
            debug!(path = ?self.path, "loaded settings from file");
        } else {
            debug!(path = ?self.path, "settings file not found, using defaults");
        }
        for rejected in &self.rejected {
            warn!(
                key = rejected.key,
                value = %rejected.value,
                expected = rejected.expected,
                "invalid env override, ignoring"
            );
        }
    }
}

/// An environment override whose value did not parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LoadedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors; unparseable env overrides are skipped and reported in
/// [`LoadedSettings::rejected`].
pub fn load_settings_from_path(path: &Path) -> Result<LoadedSettings> {
    let defaults = serde_json::to_value(PairlinkSettings::default())?;

    let from_file = path.exists();
    let merged = if from_file {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        defaults
    };

    let mut settings: PairlinkSettings = serde_json::from_value(merged)?;
    let rejected = apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        path: path.to_path_buf(),
        from_file,
        rejected,
    })
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

/// Apply `PAIRLINK_*` environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut PairlinkSettings) -> Vec<RejectedOverride> {
    apply_overrides_from(settings, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`. Values that fail to parse leave
/// the setting untouched and are returned.
pub fn apply_overrides_from(
    settings: &mut PairlinkSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RejectedOverride> {
    let mut env = EnvReader {
        lookup,
        rejected: Vec::new(),
    };

    if let Some(v) = env.string("PAIRLINK_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("PAIRLINK_PORT", "port number 0-65535", |v| {
        parse_u16_range(v, 0, 65535)
    }) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("PAIRLINK_DEFAULT_PHONE") {
        settings.server.default_phone = v;
    }
    if let Some(v) = env.parsed("PAIRLINK_FAILURE_RATE", "number 0.0-1.0", |v| {
        parse_f64_range(v, 0.0, 1.0)
    }) {
        settings.dispatch.failure_rate = v;
    }
    if let Some(v) = env.string("PAIRLINK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("PAIRLINK_LOG_JSON", "boolean", parse_bool) {
        settings.logging.json = v;
    }

    env.rejected
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

/// Parse a string as a finite `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
    rejected: Vec<RejectedOverride>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn parsed<T>(
        &mut self,
        key: &'static str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let value = (self.lookup)(key)?;
        let result = parse(&value);
        if result.is_none() {
            self.rejected.push(RejectedOverride {
                key,
                value,
                expected,
            });
        }
        result
    }
}
