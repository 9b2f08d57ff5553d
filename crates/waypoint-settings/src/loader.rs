//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WaypointSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::WaypointSettings;

/// Resolve the default settings path (`~/.waypoint/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".waypoint").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WaypointSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. A file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<WaypointSettings> {
    let defaults = serde_json::to_value(WaypointSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WaypointSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, arrays and primitives are replaced, and null
/// values in `source` leave `target` untouched.
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

/// Apply environment overrides, reading variables through `lookup`.
///
/// Invalid numeric values are logged and ignored.
pub fn apply_env_overrides<F>(settings: &mut WaypointSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("WAYPOINT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = string("WAYPOINT_PORT").and_then(|v| parse_in_range("WAYPOINT_PORT", &v, 1, 65535)) {
        settings.server.port = v as u16;
    }
    if let Some(v) = string("WAYPOINT_BRIDGE_URL") {
        settings.bridge.url = v;
    }
    if let Some(v) = string("WAYPOINT_COMPLETION_URL") {
        settings.completion.base_url = v;
    }
    if let Some(v) = string("WAYPOINT_MODEL") {
        settings.completion.model = v;
    }
    if let Some(v) = string("LOCATIONIQ_API_KEY") {
        settings.geocoder.api_key = Some(SecretString::from(v));
    }
    if let Some(v) = string("WAYPOINT_IDLE_INTERVAL_SECS")
        .and_then(|v| parse_in_range("WAYPOINT_IDLE_INTERVAL_SECS", &v, 1, 3600))
    {
        settings.refresh.idle_interval_secs = v;
    }
}

fn parse_in_range(name: &str, val: &str, min: u64, max: u64) -> Option<u64> {
    let parsed = val.parse::<u64>().ok().filter(|n| (min..=max).contains(n));
    if parsed.is_none() {
        tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_objects() {
        let merged = deep_merge(
            serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3}),
            serde_json::json!({"a": {"y": 20}, "c": 4}),
        );
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 20}, "b": 3, "c": 4}));
    }

    #[test]
    fn deep_merge_skips_null() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let merged = deep_merge(serde_json::json!({"a": [1, 2]}), serde_json::json!({"a": [3]}));
        assert_eq!(merged["a"], serde_json::json!([3]));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.refresh.resolve_retry_secs, 15);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"refresh": {"idleIntervalSecs": 60}, "completion": {"model": "gpt-4o-mini"}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.refresh.idle_interval_secs, 60);
        assert_eq!(settings.refresh.reading_recheck_secs, 5);
        assert_eq!(settings.completion.model, "gpt-4o-mini");
        assert_eq!(settings.completion.provider, "OpenaiChat");
    }

    #[test]
    fn zero_timings_in_file_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"refresh": {"idleIntervalSecs": 0, "readingRecheckSecs": 0, "resolveRetrySecs": 0}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.refresh.idle_interval(), std::time::Duration::from_secs(1));
        assert_eq!(settings.refresh.reading_recheck(), std::time::Duration::from_secs(1));
        assert_eq!(settings.refresh.resolve_retry(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn file_api_key_stays_out_of_debug_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"geocoder": {"apiKey": "pk.SECRET"}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        let key = settings.geocoder.api_key.as_ref().map(|k| k.expose_secret());
        assert_eq!(key, Some("pk.SECRET"));
        assert!(!format!("{settings:?}").contains("pk.SECRET"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = WaypointSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("WAYPOINT_PORT", "8088"),
                ("LOCATIONIQ_API_KEY", "pk.test"),
                ("WAYPOINT_IDLE_INTERVAL_SECS", "45"),
                ("WAYPOINT_BRIDGE_URL", "http://sim:9000"),
            ]),
        );
        assert_eq!(settings.server.port, 8088);
        let key = settings.geocoder.api_key.as_ref().map(|k| k.expose_secret());
        assert_eq!(key, Some("pk.test"));
        assert_eq!(settings.refresh.idle_interval_secs, 45);
        assert_eq!(settings.bridge.url, "http://sim:9000");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = WaypointSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[("WAYPOINT_PORT", "99999"), ("WAYPOINT_IDLE_INTERVAL_SECS", "soon")]),
        );
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.refresh.idle_interval_secs, 30);
    }
}
