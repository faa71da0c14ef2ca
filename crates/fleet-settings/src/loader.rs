//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FleetSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::FleetSettings;

/// Resolve the path to the settings file (`~/.fleet/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fleet").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FleetSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or invalid values, returns an error. Rejected env
/// overrides are logged at warn.
pub fn load_settings_from_path(path: &Path) -> Result<FleetSettings> {
    let loaded = load_settings_with_report(path)?;
    for rejected in &loaded.rejected_overrides {
        rejected.warn();
    }
    Ok(loaded.settings)
}

/// Settings together with the env overrides that were ignored.
#[derive(Clone, Debug)]
pub struct LoadedSettings {
    pub settings: FleetSettings,
    pub rejected_overrides: Vec<RejectedOverride>,
}

/// An env override whose value failed to parse and was ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    pub key: &'static str,
    pub value: String,
}

impl RejectedOverride {
    /// Log the rejection at warn.
    pub fn warn(&self) {
        tracing::warn!(key = self.key, value = %self.value, "invalid env override, ignoring");
    }
}

/// Like [`load_settings_from_path`], but hands rejected env overrides back
/// to the caller instead of logging them. Used before a subscriber exists.
pub fn load_settings_with_report(path: &Path) -> Result<LoadedSettings> {
    let mut settings = read_layered(path)?;
    let rejected_overrides = apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        rejected_overrides,
    })
}

fn read_layered(path: &Path) -> Result<FleetSettings> {
    let defaults = serde_json::to_value(FleetSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
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

/// Apply `FLEET_*` environment variable overrides.
///
/// Invalid values leave the file/default value in place and are returned.
#[must_use]
pub fn apply_env_overrides(settings: &mut FleetSettings) -> Vec<RejectedOverride> {
    apply_overrides(settings, |name| std::env::var(name).ok())
}

fn apply_overrides(
    settings: &mut FleetSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RejectedOverride> {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut rejected = Vec::new();
    let mut reject = |key: &'static str, value: String| {
        rejected.push(RejectedOverride { key, value });
    };

    if let Some(v) = read("FLEET_MAX_COMPLETED") {
        match parse_usize_range(&v, 1, 100_000) {
            Some(n) => settings.registry.max_completed = n,
            None => reject("FLEET_MAX_COMPLETED", v),
        }
    }
    if let Some(v) = read("FLEET_WAIT_TIMEOUT_SECS") {
        match parse_u64_range(&v, 1, 86_400) {
            Some(n) => settings.wait.default_timeout_secs = n,
            None => reject("FLEET_WAIT_TIMEOUT_SECS", v),
        }
    }
    if let Some(v) = read("FLEET_HTTP_ADDR") {
        settings.server.http_addr = Some(v);
    }
    if let Some(v) = read("FLEET_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("FLEET_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => reject("FLEET_LOG_JSON", v),
        }
    }
    rejected
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

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"registry": {"maxCompleted": 100, "recentIdsLimit": 3}});
        let source = serde_json::json!({"registry": {"maxCompleted": 10}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["registry"]["maxCompleted"], 10);
        assert_eq!(merged["registry"]["recentIdsLimit"], 3);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"args": [1, 2, 3]});
        let source = serde_json::json!({"args": [4]});
        assert_eq!(deep_merge(target, source)["args"], serde_json::json!([4]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = read_layered(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.registry.max_completed, 100);
        assert!(settings.providers.is_empty());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"registry": {"maxCompleted": 20}, "wait": {"defaultTimeoutSecs": 60}}"#,
        )
        .unwrap();

        let settings = read_layered(&path).unwrap();
        assert_eq!(settings.registry.max_completed, 20);
        assert_eq!(settings.registry.recent_results_limit, 5);
        assert_eq!(settings.wait.default_timeout_secs, 60);
        assert_eq!(settings.wait.result_preview_chars, 500);
    }

    #[test]
    fn load_providers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"providers": {"codex": {"command": "codex", "args": ["exec", "-m", "{model}"], "defaultModel": "gpt-5"}}}"#,
        )
        .unwrap();

        let settings = read_layered(&path).unwrap();
        let codex = &settings.providers["codex"];
        assert_eq!(codex.command, "codex");
        assert_eq!(codex.args.len(), 3);
        assert_eq!(codex.timeout_secs, 600);
        assert_eq!(codex.default_model, "gpt-5");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"registry": {"maxCompleted": 0}}"#).unwrap();

        let settings = read_layered(&path).unwrap();
        assert!(matches!(
            settings.validate().unwrap_err(),
            SettingsError::InvalidValue(_)
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = FleetSettings::default();
        let rejected = apply_overrides(
            &mut settings,
            env(&[
                ("FLEET_MAX_COMPLETED", "250"),
                ("FLEET_WAIT_TIMEOUT_SECS", "30"),
                ("FLEET_HTTP_ADDR", "127.0.0.1:9191"),
                ("FLEET_LOG_LEVEL", "debug"),
                ("FLEET_LOG_JSON", "off"),
            ]),
        );
        assert_eq!(settings.registry.max_completed, 250);
        assert_eq!(settings.wait.default_timeout_secs, 30);
        assert_eq!(settings.server.http_addr.as_deref(), Some("127.0.0.1:9191"));
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.logging.json);
        assert!(rejected.is_empty());
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = FleetSettings::default();
        let rejected = apply_overrides(
            &mut settings,
            env(&[
                ("FLEET_MAX_COMPLETED", "0"),
                ("FLEET_WAIT_TIMEOUT_SECS", "forever"),
                ("FLEET_LOG_JSON", "maybe"),
                ("FLEET_HTTP_ADDR", ""),
            ]),
        );
        assert_eq!(settings.registry.max_completed, 100);
        assert_eq!(settings.wait.default_timeout_secs, 300);
        assert!(settings.logging.json);
        assert!(settings.server.http_addr.is_none());

        let keys: Vec<&str> = rejected.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            vec!["FLEET_MAX_COMPLETED", "FLEET_WAIT_TIMEOUT_SECS", "FLEET_LOG_JSON"]
        );
        assert_eq!(rejected[1].value, "forever");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "Yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "FALSE", "No", "OFF"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u64_range("30", 1, 86_400), Some(30));
        assert_eq!(parse_u64_range("0", 1, 86_400), None);
        assert_eq!(parse_u64_range("abc", 1, 86_400), None);
        assert_eq!(parse_usize_range("50", 1, 100_000), Some(50));
        assert_eq!(parse_usize_range("200000", 1, 100_000), None);
    }
}
